use leptos::*;
use leptos_use::{use_clipboard, UseClipboardReturn};

use super::{
    avatar_url, public_collection_url, resolve_new_member, submit, Capability, Collection,
    EditMode, Member, OwnerEdit, Permissions, PublicUser, SubmitOutcome, TeamEditor, UserID,
    UserRef,
};
use crate::app::toast::use_toaster;
use crate::app::{get_public_user, ServerDirectory, ServerStore};

/// Applies an owner-only change to the draft. Anyone else is turned away
/// and the draft stays exactly as it was.
fn edit_draft(
    editor: RwSignal<TeamEditor>,
    permissions: Permissions,
    change: impl FnOnce(&mut OwnerEdit<'_>),
) {
    if !permissions.is_owner() {
        logging::warn!("ignoring edit without owner permission");
        return;
    }
    editor.update(|e| {
        if let Ok(mut edit) = e.collection.owner_edit(permissions) {
            change(&mut edit);
        }
    });
}

/// The draft alone, so views reading it ignore keystrokes in the invite box.
fn draft_of(editor: RwSignal<TeamEditor>) -> Memo<Collection> {
    create_memo(move |_| editor.with(|e| e.collection.draft().clone()))
}

/// Sharing and membership settings of one collection.
#[component]
pub fn TeamManagement(
    editor: RwSignal<TeamEditor>,
    mode: EditMode,
    viewer: Option<PublicUser>,
    #[prop(into)] on_dismiss: Callback<()>,
) -> impl IntoView {
    let toaster = use_toaster();

    let viewer_id = viewer.as_ref().map(|v| v.id);
    let acting_username = store_value(
        viewer
            .as_ref()
            .map(|v| v.username.clone())
            .unwrap_or_default(),
    );

    let permissions = create_memo(move |_| {
        editor.with(|e| Permissions::resolve(e.collection.canonical(), viewer_id))
    });
    let is_owner = move || permissions.get().is_owner();
    let draft = draft_of(editor);

    let owner = create_resource(
        move || editor.with(|e| e.collection.canonical().owner_id),
        move |owner_id| {
            let fallback = viewer.clone();
            async move {
                match owner_id {
                    Some(id) => get_public_user(UserRef::ID(id)).await.ok(),
                    None => fallback,
                }
            }
        },
    );

    // `window` only exists once hydrated
    let origin = create_rw_signal(String::new());
    create_effect(move |_| origin.set(window().location().origin().unwrap_or_default()));

    let public_url = move || {
        draft
            .with(|d| d.id)
            .map(|id| public_collection_url(&origin.get(), id))
    };

    let UseClipboardReturn {
        is_supported,
        copied,
        copy,
        ..
    } = use_clipboard();

    create_effect(move |_| {
        if copied.get() {
            toaster.success("Copied!");
        }
    });

    let add_member = move || {
        let permissions = permissions.get_untracked();
        if !permissions.is_owner() {
            return;
        }

        let (target, snapshot) =
            editor.with_untracked(|e| (e.invite.clone(), e.collection.draft().clone()));
        let acting = acting_username.get_value();

        spawn_local(async move {
            match resolve_new_member(&ServerDirectory, &acting, &target, &snapshot).await {
                Ok(member) => {
                    let accepted = editor
                        .try_update(|e| e.accept_member(permissions, member))
                        .unwrap_or(Ok(()));
                    if let Err(err) = accepted {
                        toaster.error(err.to_string());
                    }
                }
                Err(err) if err.is_silent() => {}
                Err(err) => toaster.error(err.to_string()),
            }
        });
    };

    let remove_member = Callback::new(move |username: String| {
        edit_draft(editor, permissions.get_untracked(), |edit| {
            edit.remove_member(&username);
        });
    });

    let toggle_capability = Callback::new(move |(username, capability): (String, Capability)| {
        edit_draft(editor, permissions.get_untracked(), |edit| {
            edit.toggle_capability(&username, capability);
        });
    });

    let submitting = create_rw_signal(false);
    let on_submit = move |_| {
        if submitting.get_untracked() {
            return;
        }
        submitting.set(true);

        let draft = draft.get_untracked();
        let pending = toaster.loading(mode.pending_label());

        spawn_local(async move {
            let outcome = submit(&ServerStore, mode, &draft).await;
            toaster.dismiss(pending);

            let message = outcome.message().to_string();
            match outcome {
                SubmitOutcome::Saved(saved) => {
                    editor.update(|e| e.collection.commit(saved));
                    toaster.success(message);
                    on_dismiss(());
                }
                SubmitOutcome::Rejected(_) => toaster.error(message),
            }

            submitting.set(false);
        });
    };

    let public_link = move || {
        let url = public_url()?;
        if !draft.with(|d| d.is_public) {
            return None;
        }
        let copy = copy.clone();
        let target = url.clone();

        Some(view! {
            <div class="public-link">
                <p class="section-title">"Public Link (Click to copy)"</p>
                <div
                    class="public-link-url"
                    on:click=move |_| {
                        if is_supported.get_untracked() {
                            copy(&target);
                        } else {
                            logging::error!("clipboard unavailable, could not copy {target}");
                        }
                    }
                >
                    {url}
                </div>
            </div>
        })
    };

    let members = move || {
        let editable = is_owner();
        draft.with(|d| {
            let members = d.sorted_members();
            if members.is_empty() {
                return None;
            }

            let cards = members
                .into_iter()
                .map(|member| {
                    view! {
                        <MemberCard
                            member=member.clone()
                            editable=editable
                            on_remove=remove_member
                            on_toggle=toggle_capability
                        />
                    }
                })
                .collect_view();

            Some(view! {
                <p class="member-note">
                    "(All Members have " <b>"Read"</b> " access to this collection.)"
                </p>
                <div class="member-list">{cards}</div>
            })
        })
    };

    view! {
        <div class="team-management">
            <Show when=is_owner>
                <p class="section-title">"Make Public"</p>
                <label class="checkbox">
                    <input
                        type="checkbox"
                        prop:checked=move || draft.with(|d| d.is_public)
                        on:change=move |_| {
                            edit_draft(editor, permissions.get_untracked(), |edit| edit.toggle_public())
                        }
                    />
                    "Make this a public collection."
                </label>
                <p class="hint">"This will let " <b>"Anyone"</b> " to view this collection."</p>
            </Show>

            {public_link}

            <Show when=move || !is_owner() && draft.with(|d| d.is_public)>
                <hr/>
            </Show>

            <Show when=is_owner>
                <p class="section-title">"Member Management"</p>
                <div class="member-invite">
                    <input
                        type="text"
                        placeholder="Username (without the '@')"
                        prop:value=move || editor.with(|e| e.invite.clone())
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            editor.update(|e| e.invite = value);
                        }
                        on:keydown=move |ev: ev::KeyboardEvent| {
                            if ev.key() == "Enter" {
                                add_member();
                            }
                        }
                    />
                    <button class="btn-invite" title="Add Member" on:click=move |_| add_member()>
                        <i class="bi-person-plus"></i>
                    </button>
                </div>
            </Show>

            {members}

            <OwnerCard owner fallback_id=viewer_id editor/>

            <Show when=is_owner>
                <button
                    class="btn-submit"
                    disabled=move || submitting.get()
                    on:click=on_submit
                >
                    {mode.submit_label()}
                </button>
            </Show>
        </div>
    }
}

#[component]
fn OwnerCard(
    owner: Resource<Option<UserID>, Option<PublicUser>>,
    fallback_id: Option<UserID>,
    editor: RwSignal<TeamEditor>,
) -> impl IntoView {
    let owner_id = move || {
        editor
            .with(|e| e.collection.canonical().owner_id)
            .or(fallback_id)
    };
    let name = move || owner.get().flatten().map(|o| o.name).unwrap_or_default();
    let username = move || {
        owner
            .get()
            .flatten()
            .map(|o| o.username)
            .unwrap_or_default()
    };

    // shown right away; name and username fill in once the lookup lands
    view! {
        <div
            class="owner-card"
            title=move || format!("'@{}' is the owner of this collection.", username())
        >
            {move || owner_id().map(|id| view! { <img class="avatar" src=avatar_url(id)/> })}
            <div>
                <p class="member-name">
                    {name} <i class="bi-crown owner-crown"></i>
                </p>
                <p class="member-username">"@" {username}</p>
            </div>
        </div>
    }
}

#[component]
fn MemberCard(
    member: Member,
    editable: bool,
    on_remove: Callback<String>,
    on_toggle: Callback<(String, Capability)>,
) -> impl IntoView {
    let username = member.user.username.clone();

    let remove = editable.then(|| {
        let username = username.clone();
        view! {
            <button
                class="member-remove"
                title="Remove Member"
                on:click=move |_| on_remove(username.clone())
            >
                <i class="bi-x"></i>
            </button>
        }
    });

    let capabilities = if !editable && !member.has_any() {
        view! { <p class="hint">"Has no permissions."</p> }.into_view()
    } else {
        Capability::ALL
            .into_iter()
            .map(|capability| {
                let username = username.clone();
                view! {
                    <label class="capability" class:editable=editable>
                        <input
                            type="checkbox"
                            class="peer sr-only"
                            prop:checked=member.has(capability)
                            disabled=!editable
                            on:change=move |_| on_toggle((username.clone(), capability))
                        />
                        <span>{capability.label()}</span>
                    </label>
                }
            })
            .collect_view()
    };

    view! {
        <div class="member-card">
            {remove}
            <div class="member-identity">
                <img class="avatar" src=avatar_url(member.user_id)/>
                <div>
                    <p class="member-name">{member.user.name.clone()}</p>
                    <p class="member-username">"@" {member.user.username.clone()}</p>
                </div>
            </div>
            <div class="member-capabilities">
                <p class="section-title">"Permissions"</p>
                {editable.then(|| view! { <p class="hint">"(Click to toggle.)"</p> })}
                {capabilities}
            </div>
        </div>
    }
}

#[cfg(all(test, feature = "ssr"))]
mod tests {
    use serde_json::Map;
    use tokio::task::LocalSet;

    use std::cell::Cell;
    use std::rc::Rc;

    use super::super::tests::member;
    use super::super::CollectionID;
    use super::*;
    use crate::app::toast::provide_toaster;

    fn shared(members: Vec<Member>) -> Collection {
        Collection {
            id: Some(CollectionID(1)),
            owner_id: Some(UserID(1)),
            is_public: false,
            members,
            rest: Map::new(),
        }
    }

    fn user(id: i64, username: &str) -> PublicUser {
        PublicUser {
            id: UserID(id),
            name: username.to_uppercase(),
            username: username.to_string(),
        }
    }

    // resources spawn onto the current LocalSet while rendering
    fn render(collection: Collection, viewer: Option<PublicUser>) -> String {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        LocalSet::new().block_on(&runtime, async move {
            leptos::ssr::render_to_string(move || {
                provide_toaster();
                let editor = create_rw_signal(TeamEditor::new(collection));
                view! {
                    <TeamManagement
                        editor
                        mode=EditMode::Update
                        viewer
                        on_dismiss=|_: ()| {}
                    />
                }
            })
            .to_string()
        })
    }

    #[test]
    fn owner_gets_the_editing_controls() {
        let html = render(
            shared(vec![member(5, "eve"), member(2, "bob")]),
            Some(user(1, "ann")),
        );

        assert!(html.contains("Make Public"));
        assert!(html.contains("Member Management"));
        assert!(html.contains("member-remove"));
        assert!(html.contains("btn-submit"));
        assert!(html.contains("Save"));
        assert!(html.contains("member-note"));
        assert!(!html.contains("Has no permissions."));

        let bob = html.find("/api/avatar/2").unwrap();
        let eve = html.find("/api/avatar/5").unwrap();
        assert!(bob < eve);
    }

    #[test]
    fn other_viewers_only_see_the_team() {
        let html = render(
            shared(vec![member(5, "eve"), member(2, "bob")]),
            Some(user(2, "bob")),
        );

        assert!(!html.contains("Make Public"));
        assert!(!html.contains("Member Management"));
        assert!(!html.contains("member-remove"));
        assert!(!html.contains("btn-submit"));
        assert!(html.contains("Has no permissions."));
        assert!(html.contains("owner-card"));

        let bob = html.find("/api/avatar/2").unwrap();
        let eve = html.find("/api/avatar/5").unwrap();
        assert!(bob < eve);
    }

    #[test]
    fn invite_typing_leaves_the_draft_alone() {
        let runtime = create_runtime();
        let editor = create_rw_signal(TeamEditor::new(shared(vec![member(5, "eve")])));
        let draft = draft_of(editor);

        let renders = Rc::new(Cell::new(0));
        let counted = renders.clone();
        let members = create_memo(move |_| {
            counted.set(counted.get() + 1);
            draft.with(|d| d.members.len())
        });

        assert_eq!(members.get(), 1);
        editor.update(|e| e.invite = "bo".to_string());
        assert_eq!(members.get(), 1);
        assert_eq!(renders.get(), 1);

        editor.update(|e| {
            e.collection
                .owner_edit(Permissions::Owner)
                .unwrap()
                .remove_member("eve");
        });
        assert_eq!(members.get(), 0);
        assert_eq!(renders.get(), 2);

        runtime.dispose();
    }

    #[test]
    fn empty_team_still_shows_the_owner() {
        let html = render(shared(vec![]), Some(user(1, "ann")));

        assert!(!html.contains("member-note"));
        assert!(!html.contains("member-card"));
        assert!(html.contains("owner-card"));
        assert!(html.contains("/api/avatar/1"));
        assert!(html.contains("Save"));
    }
}
