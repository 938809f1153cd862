use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BridgeError {
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,
    /// Caller is not the admin, the oracle or a registered consumer
    NotAuthorized = 3,
    /// Consumer id already has an unfulfilled, unexpired request
    RequestAlreadyPending = 4,
    /// Request never issued, superseded, or already fulfilled with another value
    UnknownRequest = 5,
    /// Critical storage data missing (contract state corrupted)
    StorageCorrupted = 6,
}
