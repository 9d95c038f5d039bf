/// Brocat Crypto Library
///
/// Password storage only: Argon2id digests in PHC string form, salted per call.
/// Nothing in here can turn a digest back into a password.

pub mod password;

pub use password::PasswordDigest;
