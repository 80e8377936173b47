use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890";

const RESOURCE_ID_LENGTH: usize = 10;
const SHORT_ID_LENGTH: usize = 5;

// AWS resource tags accept at most 256 characters per value.
const TAG_VALUE_MAX_LENGTH: usize = 256;

/// Random name for a back-end resource: ten characters of `[a-z0-9]`.
///
/// Every create call asks for fresh ids instead of deriving them from the room name,
/// so names never collide across rooms and always satisfy back-end charset rules.
pub(crate) fn resource_id() -> String {
    generate(RESOURCE_ID_LENGTH)
}

pub(crate) fn short_id() -> String {
    generate(SHORT_ID_LENGTH)
}

/// Human-readable room label clipped to the tag value limit.
pub(crate) fn tag_value(room_name: &str) -> String {
    room_name.chars().take(TAG_VALUE_MAX_LENGTH).collect()
}

fn generate(len: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
