use crate::domains::chat::User;
use crate::error::Result;
use crate::interfaces::store::SyncedStore;

/// Fixed demo identities. Login picks one of these at random; the ids are
/// stable so repeat visits can land on the same rows.
pub const DEMO_USER_IDS: [&str; 9] = [
    "6z7dkeVLNm",
    "ycD76wW4R2",
    "IoQSaxeVO5",
    "WndZWmGkO4",
    "ENzoNm7g4E",
    "dLKecN3ntd",
    "7VoEoJWEwn",
    "enVvyDlBul",
    "9ogaDuDNFx",
];

const DEMO_USER_NAMES: [&str; 9] = [
    "Alex", "Aaron", "Erik", "Greg", "Darick", "Matt", "Cindy", "Meghan", "Paul",
];

pub fn demo_user_ids() -> Vec<String> {
    DEMO_USER_IDS.iter().map(|id| id.to_string()).collect()
}

pub fn demo_users() -> Vec<User> {
    DEMO_USER_IDS
        .iter()
        .zip(DEMO_USER_NAMES)
        .enumerate()
        .map(|(index, (id, name))| User {
            id: id.to_string(),
            name: name.to_string(),
            partner: index % 2 == 0,
        })
        .collect()
}

pub async fn apply(store: &dyn SyncedStore) -> Result<()> {
    for user in demo_users() {
        store.upsert_user(user).await?;
    }
    Ok(())
}
