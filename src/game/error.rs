//! Room request errors

/// Rejected room requests. The display string is what the client sees in
/// `roomError.message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room name already exists")]
    NameTaken,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Room is full")]
    RoomFull,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Not in a room")]
    NotInRoom,

    /// The room task stopped while the request was in flight
    #[error("Room is closing")]
    RoomClosed,
}
