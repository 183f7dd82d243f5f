//! Identifier generation

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated room ids
pub const ROOM_ID_LEN: usize = 9;

/// Short, URL-safe room id (lowercase alphanumerics)
pub fn generate_room_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_ID_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Room-scoped entity id: `<prefix>_<generation>_<random suffix>`
pub fn entity_id<R: Rng + ?Sized>(prefix: &str, generation: u64, rng: &mut R) -> String {
    format!("{}_{}_{:06x}", prefix, generation, rng.gen_range(0..0x100_0000u32))
}
