use serde::Serialize;

/// Public identity shape returned by login; never carries the hash.
#[derive(Serialize, Debug, Clone)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}
