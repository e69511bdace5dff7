mod av_pair;
mod ntlm_authenticate_message;
mod ntlm_challenge_message;
mod ntlm_client;
mod ntlm_message;
mod ntlm_negotiate_message;

pub use av_pair::{AV_FLAG_MIC_PRESENT, AvId, AvPair, AvPairList};
pub use ntlm_message::NTLMNegotiateFlags;

pub type NTLMClientContext = ntlm_client::NTLMClientContext;
pub type NTLMClientNonces = ntlm_client::NTLMClientNonces;
pub type NTLMAuthenticateOutput = ntlm_client::NTLMAuthenticateOutput;
pub type NTLMMessage = ntlm_message::NTLMMessage;
pub type NTLMNegotiateMessageBody = ntlm_negotiate_message::NTLMNegotiateMessageBody;
pub type NTLMChallengeMessageBody = ntlm_challenge_message::NTLMChallengeMessageBody;
pub type NTLMAuthenticateMessageBody = ntlm_authenticate_message::NTLMAuthenticateMessageBody;
