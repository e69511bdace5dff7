use digest::Mac;

/// SP800-108 key derivation in counter mode with a 32-bit counter and length,
/// as used for the SMB 3.x signing key.
pub fn derive_key<T: Mac + Clone>(mac: T, label: &[u8], context: &[u8], key_len_bits: u32) -> Vec<u8> {
    let key_len = (key_len_bits / 8) as usize;
    let mut output = Vec::with_capacity(key_len);
    let mut counter: u32 = 1;
    while output.len() < key_len {
        let block = mac.clone()
            .chain_update(counter.to_be_bytes())
            .chain_update(label)
            .chain_update([0u8])
            .chain_update(context)
            .chain_update(key_len_bits.to_be_bytes())
            .finalize()
            .into_bytes();
        let needed = (key_len - output.len()).min(block.len());
        output.extend_from_slice(&block[..needed]);
        counter += 1;
    }
    output
}
