mod spnego_token;
mod spnego_token_init;
mod spnego_token_response;
mod spnego_provider;

pub(crate) mod der_utils;

pub type SPNEGOToken = spnego_token::SPNEGOToken;
pub type SPNEGOTokenInitBody = spnego_token_init::SPNEGOTokenInitBody;
pub type SPNEGOTokenResponseBody = spnego_token_response::SPNEGOTokenResponseBody;
pub type NegotiateState = spnego_token_response::NegotiateState;
pub type SPNEGOAuthProvider<A> = spnego_provider::SPNEGOAuthProvider<A>;
