use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Capability, Collection, Member, Permissions, PublicUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("only the collection owner can change this")]
    Forbidden,
    #[error("User already exists.")]
    DuplicateMember,
}

/// Server-confirmed collection plus the copy being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDraft {
    canonical: Collection,
    draft: Collection,
}

impl CollectionDraft {
    pub fn new(collection: Collection) -> Self {
        Self {
            draft: collection.clone(),
            canonical: collection,
        }
    }

    pub fn canonical(&self) -> &Collection {
        &self.canonical
    }

    pub fn draft(&self) -> &Collection {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.canonical != self.draft
    }

    /// Adopts what the backend persisted as both the baseline and the draft.
    pub fn commit(&mut self, saved: Collection) {
        self.draft = saved.clone();
        self.canonical = saved;
    }

    pub fn revert(&mut self) {
        self.draft = self.canonical.clone();
    }

    /// Every mutation of the draft goes through here.
    pub fn owner_edit(&mut self, permissions: Permissions) -> Result<OwnerEdit<'_>, EditError> {
        if !permissions.is_owner() {
            return Err(EditError::Forbidden);
        }
        Ok(OwnerEdit {
            draft: &mut self.draft,
        })
    }
}

pub struct OwnerEdit<'a> {
    draft: &'a mut Collection,
}

impl OwnerEdit<'_> {
    pub fn rename(&mut self, name: &str) {
        self.draft
            .rest
            .insert("name".to_string(), Value::String(name.to_string()));
    }

    pub fn toggle_public(&mut self) {
        self.draft.is_public = !self.draft.is_public;
    }

    pub fn push_member(&mut self, member: Member) -> Result<(), EditError> {
        if self.draft.has_member(&member.user.username) {
            return Err(EditError::DuplicateMember);
        }
        self.draft.members.push(member);
        Ok(())
    }

    /// Returns whether a member with that username was removed.
    pub fn remove_member(&mut self, username: &str) -> bool {
        let before = self.draft.members.len();
        self.draft.members.retain(|m| m.user.username != username);
        self.draft.members.len() != before
    }

    /// Returns the new flag value, or `None` when nobody has that username.
    pub fn toggle_capability(&mut self, username: &str, capability: Capability) -> Option<bool> {
        let member = self
            .draft
            .members
            .iter_mut()
            .find(|m| m.user.username == username)?;
        let flag = member.flag_mut(capability);
        *flag = !*flag;
        Some(*flag)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddMemberError {
    #[error("username is empty")]
    Empty,
    #[error("User already exists.")]
    AlreadyMember,
    #[error("You are already the collection owner.")]
    IsOwner,
    #[error("User not found.")]
    NotFound,
    /// The lookup itself failed; carries the backend's message.
    #[error("{0}")]
    Lookup(String),
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl AddMemberError {
    /// Whether the user should hear about it. An empty box is just ignored.
    pub fn is_silent(&self) -> bool {
        matches!(self, AddMemberError::Empty)
    }
}

/// Checks a typed username before it is looked up. Returns it trimmed.
pub fn validate_new_member(
    acting_username: &str,
    target_username: &str,
    collection: &Collection,
) -> Result<String, AddMemberError> {
    let target = target_username.trim();

    if target.is_empty() {
        return Err(AddMemberError::Empty);
    }
    if collection.has_member(target) {
        return Err(AddMemberError::AlreadyMember);
    }
    if target.eq_ignore_ascii_case(acting_username.trim()) {
        return Err(AddMemberError::IsOwner);
    }

    Ok(target.to_string())
}

/// Public user lookup used to turn a typed username into a member.
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    /// Fails with [`AddMemberError::NotFound`] for unknown users and
    /// [`AddMemberError::Lookup`] when the directory can't answer.
    async fn find_by_username(&self, username: &str) -> Result<PublicUser, AddMemberError>;
}

pub async fn resolve_new_member<D: UserDirectory>(
    directory: &D,
    acting_username: &str,
    target_username: &str,
    collection: &Collection,
) -> Result<Member, AddMemberError> {
    let target = validate_new_member(acting_username, target_username, collection)?;

    let user = directory.find_by_username(&target.to_lowercase()).await?;

    Ok(Member::read_only(user, collection.id))
}

/// Editor state: the draft plus the username being typed.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamEditor {
    pub collection: CollectionDraft,
    pub invite: String,
}

impl TeamEditor {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection: CollectionDraft::new(collection),
            invite: String::new(),
        }
    }

    /// Appends a resolved member and clears the input.
    pub fn accept_member(
        &mut self,
        permissions: Permissions,
        member: Member,
    ) -> Result<(), EditError> {
        self.collection.owner_edit(permissions)?.push_member(member)?;
        self.invite.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    Create,
    Update,
}

impl EditMode {
    pub fn submit_label(self) -> &'static str {
        match self {
            EditMode::Create => "Add",
            EditMode::Update => "Save",
        }
    }

    pub fn pending_label(self) -> &'static str {
        match self {
            EditMode::Create => "Creating...",
            EditMode::Update => "Applying...",
        }
    }
}

/// Persistence for collections. An `Err` carries the backend's message.
#[allow(async_fn_in_trait)]
pub trait CollectionStore {
    async fn create(&self, collection: &Collection) -> Result<Collection, String>;
    async fn update(&self, collection: &Collection) -> Result<Collection, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(Collection),
    Rejected(String),
}

impl SubmitOutcome {
    pub fn message(&self) -> &str {
        match self {
            SubmitOutcome::Saved(_) => "Collection Saved!",
            SubmitOutcome::Rejected(message) => message,
        }
    }

    /// The modal closes only once the backend accepted the draft.
    pub fn dismisses(&self) -> bool {
        matches!(self, SubmitOutcome::Saved(_))
    }
}

pub async fn submit<S: CollectionStore>(
    store: &S,
    mode: EditMode,
    draft: &Collection,
) -> SubmitOutcome {
    let response = match mode {
        EditMode::Create => store.create(draft).await,
        EditMode::Update => store.update(draft).await,
    };

    match response {
        Ok(saved) => SubmitOutcome::Saved(saved),
        Err(message) => SubmitOutcome::Rejected(message),
    }
}
