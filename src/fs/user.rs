use log::info;
use serde::{Deserialize, Serialize};

use crate::utils::traits::FixedRecord;

use super::{Partition, MAX_NAME_LENGTH};

pub const ROOT_UID: u32 = 0;

/// the identity every permission check is made against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub group_id: u32,
}

impl User {
    pub fn root() -> Self {
        User::new(ROOT_UID, 0)
    }

    /// a user named after its id, `root` for uid 0
    pub fn new(id: u32, group_id: u32) -> Self {
        let name = if id == ROOT_UID {
            "root".to_string()
        } else {
            format!("user{id}")
        };
        User { id, name, group_id }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_UID
    }
}

/// [User] as persisted: id, NUL-padded name, group id
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct UserRecord {
    id: u32,
    name: [u8; MAX_NAME_LENGTH],
    group_id: u32,
}

impl FixedRecord for UserRecord {
    const RECORD_SIZE: usize = 4 + MAX_NAME_LENGTH + 4;
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        let mut name = [0u8; MAX_NAME_LENGTH];
        let bytes = user.name.as_bytes();
        // keep the trailing NUL
        let len = bytes.len().min(MAX_NAME_LENGTH - 1);
        name[..len].copy_from_slice(&bytes[..len]);
        UserRecord {
            id: user.id,
            name,
            group_id: user.group_id,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let len = record
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LENGTH);
        User {
            id: record.id,
            name: String::from_utf8_lossy(&record.name[..len]).into_owned(),
            group_id: record.group_id,
        }
    }
}

impl Partition {
    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    /// act as `uid`/`gid` from now on
    pub fn switch_user(&mut self, uid: u32, gid: u32) {
        info!("switch_user() called with uid: {uid}, gid: {gid}");
        self.current_user = User::new(uid, gid);
    }
}
