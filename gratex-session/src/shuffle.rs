use sha2::{Digest, Sha256};

/// Returns the indices of `identifiers` ordered by the SHA-256 digest of each
/// identifier string. The order depends on nothing but the strings themselves,
/// so a stimulus set replays in the same sequence across sessions and machines
/// while still looking shuffled to the subject.
pub fn hashed_order<S: AsRef<str>>(identifiers: &[S]) -> Vec<usize> {
    let mut keyed: Vec<([u8; 32], usize)> = identifiers
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let digest: [u8; 32] = Sha256::digest(id.as_ref().as_bytes()).into();
            (digest, index)
        })
        .collect();
    // The index only breaks ties between identical identifiers.
    keyed.sort();
    keyed.into_iter().map(|(_, index)| index).collect()
}
