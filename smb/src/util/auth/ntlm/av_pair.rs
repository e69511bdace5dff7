use bytes::BufMut;
use nom::bytes::complete::take;
use nom::number::complete::le_u16;
use nom::IResult;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// AV_PAIR identifiers (MS-NLMP 2.2.2.1)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive)]
pub enum AvId {
    EOL = 0x00,
    NbComputerName = 0x01,
    NbDomainName = 0x02,
    DnsComputerName = 0x03,
    DnsDomainName = 0x04,
    DnsTreeName = 0x05,
    Flags = 0x06,
    Timestamp = 0x07,
    SingleHost = 0x08,
    TargetName = 0x09,
    ChannelBindings = 0x0A,
}

/// MsvAvFlags bit announcing that the AUTHENTICATE message carries a MIC.
pub const AV_FLAG_MIC_PRESENT: u32 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvPair {
    pub id: u16,
    pub value: Vec<u8>,
}

impl AvPair {
    pub fn new(id: AvId, value: Vec<u8>) -> Self {
        Self { id: id.into(), value }
    }

    pub fn av_id(&self) -> Option<AvId> {
        AvId::try_from(self.id).ok()
    }

    fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, id) = le_u16(bytes)?;
        let (remaining, len) = le_u16(remaining)?;
        let (remaining, value) = take(len as usize)(remaining)?;
        Ok((remaining, Self { id, value: value.to_vec() }))
    }
}

/// Parsed target info list, without the terminating MsvAvEOL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvPairList(pub Vec<AvPair>);

impl AvPairList {
    pub fn parse(mut bytes: &[u8]) -> IResult<&[u8], Self> {
        let mut pairs = Vec::new();
        while !bytes.is_empty() {
            let (remaining, pair) = AvPair::parse(bytes)?;
            bytes = remaining;
            if pair.id == u16::from(AvId::EOL) {
                break;
            }
            pairs.push(pair);
        }
        Ok((bytes, Self(pairs)))
    }

    pub fn get(&self, id: AvId) -> Option<&[u8]> {
        self.0.iter().find(|pair| pair.av_id() == Some(id)).map(|pair| pair.value.as_slice())
    }

    pub fn timestamp(&self) -> Option<u64> {
        let value = self.get(AvId::Timestamp)?;
        let raw: [u8; 8] = value.try_into().ok()?;
        Some(u64::from_le_bytes(raw))
    }

    pub fn flags(&self) -> u32 {
        self.get(AvId::Flags)
            .and_then(|value| value.try_into().ok())
            .map(u32::from_le_bytes)
            .unwrap_or(0)
    }

    /// ORs `flags` into MsvAvFlags, adding the pair if it is missing.
    pub fn set_flags(&mut self, flags: u32) {
        let merged = (self.flags() | flags).to_le_bytes().to_vec();
        match self.0.iter_mut().find(|pair| pair.av_id() == Some(AvId::Flags)) {
            Some(pair) => pair.value = merged,
            None => self.0.push(AvPair::new(AvId::Flags, merged)),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for pair in &self.0 {
            bytes.put_u16_le(pair.id);
            bytes.put_u16_le(pair.value.len() as u16);
            bytes.put_slice(&pair.value);
        }
        bytes.put_u16_le(AvId::EOL.into());
        bytes.put_u16_le(0);
        bytes
    }
}
