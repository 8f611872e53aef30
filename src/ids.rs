use rand::{distr::Alphanumeric, Rng};
use uuid::Uuid;

const ROOM_ID_LEN: usize = 21;

/// Source of opaque identifiers. Collisions are not checked by callers.
pub trait IdGenerator: Send + Sync {
    fn room_id(&self) -> String;
    fn token(&self) -> String;
    fn message_id(&self) -> String;
}

/// Random id generator backed by `rand` and UUIDv4
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for RandomIdGenerator {
    fn room_id(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ROOM_ID_LEN)
            .map(char::from)
            .collect()
    }

    fn token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn message_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
