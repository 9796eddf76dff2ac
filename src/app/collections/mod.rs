pub mod draft;
pub mod team;

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use draft::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionID(pub i64);

impl fmt::Display for CollectionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserID(pub i64);

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Path of the avatar image the backend serves for a user.
pub fn avatar_url(user: UserID) -> String {
    format!("/api/avatar/{user}")
}

/// Shareable address of a public collection.
pub fn public_collection_url(origin: &str, id: CollectionID) -> String {
    format!("{origin}/public/collections/{id}")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CollectionID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserID>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub members: Vec<Member>,
    /// Fields this UI doesn't edit (name, color, ...) travel back untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Collection {
    pub fn name(&self) -> &str {
        self.rest
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn member(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user.username == username)
    }

    pub fn has_member(&self, username: &str) -> bool {
        let username = username.trim().to_lowercase();
        self.members
            .iter()
            .any(|m| m.user.username.to_lowercase() == username)
    }

    /// Members in display order: ascending user id, ties keep list order.
    pub fn sorted_members(&self) -> Vec<&Member> {
        self.members.iter().sorted_by_key(|m| m.user_id).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUser {
    #[serde(default)]
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<CollectionID>,
    pub user_id: UserID,
    pub user: MemberUser,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl Member {
    /// A fresh grant with read access only.
    pub fn read_only(user: PublicUser, collection_id: Option<CollectionID>) -> Self {
        Self {
            collection_id,
            user_id: user.id,
            user: MemberUser {
                name: user.name,
                username: user.username,
            },
            can_create: false,
            can_update: false,
            can_delete: false,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Create => self.can_create,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
        }
    }

    pub fn has_any(&self) -> bool {
        Capability::ALL.into_iter().any(|c| self.has(c))
    }

    fn flag_mut(&mut self, capability: Capability) -> &mut bool {
        match capability {
            Capability::Create => &mut self.can_create,
            Capability::Update => &mut self.can_update,
            Capability::Delete => &mut self.can_delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Create,
    Update,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Create, Capability::Update, Capability::Delete];

    pub fn label(self) -> &'static str {
        match self {
            Capability::Create => "Create",
            Capability::Update => "Update",
            Capability::Delete => "Delete",
        }
    }
}

/// Read-only projection of a user, as served by the public lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserID,
    #[serde(default)]
    pub name: String,
    pub username: String,
}

/// How a user can be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRef {
    ID(UserID),
    Username(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::ID(id) => id.fmt(f),
            UserRef::Username(username) => f.write_str(username),
        }
    }
}

/// What the signed-in user may do with a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    Owner,
    Member {
        can_create: bool,
        can_update: bool,
        can_delete: bool,
    },
    None,
}

impl Permissions {
    /// Resolves the viewer's standing against server-confirmed state.
    ///
    /// A collection without an id is still being created, so whoever is
    /// editing it owns it. Membership only counts when it grants something.
    pub fn resolve(collection: &Collection, viewer: Option<UserID>) -> Self {
        let Some(viewer) = viewer else {
            return Permissions::None;
        };

        if collection.id.is_none() || collection.owner_id == Some(viewer) {
            return Permissions::Owner;
        }

        match collection.members.iter().find(|m| m.user_id == viewer) {
            Some(m) if m.has_any() => Permissions::Member {
                can_create: m.can_create,
                can_update: m.can_update,
                can_delete: m.can_delete,
            },
            _ => Permissions::None,
        }
    }

    pub fn is_owner(self) -> bool {
        self == Permissions::Owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn member(id: i64, username: &str) -> Member {
        Member::read_only(
            PublicUser {
                id: UserID(id),
                name: username.to_uppercase(),
                username: username.to_string(),
            },
            Some(CollectionID(1)),
        )
    }

    fn collection(owner: i64, members: Vec<Member>) -> Collection {
        Collection {
            id: Some(CollectionID(1)),
            owner_id: Some(UserID(owner)),
            is_public: false,
            members,
            rest: Map::new(),
        }
    }

    #[test]
    fn members_sort_by_user_id() {
        let c = collection(1, vec![member(5, "eve"), member(2, "bob")]);

        let order: Vec<_> = c.sorted_members().iter().map(|m| m.user_id).collect();
        assert_eq!(order, vec![UserID(2), UserID(5)]);
    }

    #[test]
    fn sorting_is_idempotent_and_stable() {
        let mut c = collection(
            1,
            vec![member(3, "c"), member(1, "a"), member(3, "d"), member(2, "b")],
        );

        let once: Vec<Member> = c.sorted_members().into_iter().cloned().collect();
        c.members = once.clone();
        let twice: Vec<Member> = c.sorted_members().into_iter().cloned().collect();

        assert_eq!(once, twice);
        assert_eq!(once[2].user.username, "c");
        assert_eq!(once[3].user.username, "d");
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = r##"{"id":4,"ownerId":1,"isPublic":true,"name":"Reading","color":"#0ea5e9","members":[]}"##;

        let c: Collection = serde_json::from_str(raw).unwrap();
        assert_eq!(c.name(), "Reading");

        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["color"], "#0ea5e9");
        assert_eq!(back["ownerId"], 1);
    }

    #[test]
    fn owner_and_new_collections_resolve_to_owner() {
        let c = collection(1, vec![]);
        assert_eq!(Permissions::resolve(&c, Some(UserID(1))), Permissions::Owner);

        let new = Collection::default();
        assert_eq!(Permissions::resolve(&new, Some(UserID(9))), Permissions::Owner);
        assert_eq!(Permissions::resolve(&new, None), Permissions::None);
    }

    #[test]
    fn members_without_grants_have_no_permissions() {
        let mut granted = member(2, "bob");
        granted.can_update = true;
        let c = collection(1, vec![granted, member(3, "carol")]);

        assert_eq!(
            Permissions::resolve(&c, Some(UserID(2))),
            Permissions::Member {
                can_create: false,
                can_update: true,
                can_delete: false,
            }
        );
        assert_eq!(Permissions::resolve(&c, Some(UserID(3))), Permissions::None);
        assert_eq!(Permissions::resolve(&c, Some(UserID(4))), Permissions::None);
    }

    #[test]
    fn public_link_uses_origin_and_id() {
        assert_eq!(
            public_collection_url("https://shelf.example", CollectionID(12)),
            "https://shelf.example/public/collections/12"
        );
    }
}
