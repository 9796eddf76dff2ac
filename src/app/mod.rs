pub mod archives;
#[cfg(feature = "ssr")]
pub mod backend;
pub mod collections;
pub mod toast;

use crate::error_template::{error_view, AppError, ErrorTemplate};
use leptos::server_fn::codec::Json;
use leptos::*;
use leptos_meta::*;
use leptos_router::*;

use self::archives::{archive_path, ArchivedFormat, Link, LinkID, PreservedFormatRow};
use self::collections::team::TeamManagement;
use self::collections::{
    AddMemberError, Collection, CollectionID, CollectionStore, EditMode, Permissions, PublicUser,
    TeamEditor, UserDirectory, UserRef,
};
use self::toast::{provide_toaster, Toasts};

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();
    provide_toaster();

    view! {
        <Stylesheet id="leptos" href="/pkg/linkshelf.css"/>
        <Title text="Linkshelf"/>

        <Router fallback=|| {
            let mut outside_errors = Errors::default();
            outside_errors.insert_with_default_key(AppError::NotFound);
            view! {
                <ErrorTemplate outside_errors/>
            }
            .into_view()
        }>
            <main>
                <Routes>
                    <Route path="/collections/new" view=|| view! { <CollectionPage mode=EditMode::Create/> }/>
                    <Route path="/collections/:id" view=|| view! { <CollectionPage mode=EditMode::Update/> }/>
                    <Route path="/links/:id" view=LinkArchivesPage/>
                    <Route path="/public/links/:id" view=LinkArchivesPage/>
                    <Route path="/preserved/:id" view=PreservedViewerPage/>
                    <Route path="/public/preserved/:id" view=PreservedViewerPage/>
                </Routes>
            </main>
            <Toasts/>
        </Router>
    }
}

fn id_param(params: &ParamsMap) -> Option<i64> {
    params.get("id").and_then(|id| id.parse().ok())
}

/// Loads a collection and the signed-in user, then opens its sharing modal.
#[component]
fn CollectionPage(mode: EditMode) -> impl IntoView {
    let params = use_params_map();
    let id = move || params.with(id_param).map(CollectionID);

    let data = create_resource(id, move |id| async move {
        let viewer = get_session_user()
            .await
            .map_err(|err| AppError::Unavailable(server_fn_message(&err)))?;

        let collection = match (mode, id) {
            (EditMode::Create, _) => Collection::default(),
            (EditMode::Update, Some(id)) => get_collection(id)
                .await
                .map_err(|err| AppError::Unavailable(server_fn_message(&err)))?,
            (EditMode::Update, None) => return Err(AppError::NotFound),
        };

        Ok::<_, AppError>((collection, viewer))
    });

    view! {
        <Suspense fallback=|| view! { <p>"Loading..."</p> }>
            {move || data.get().map(|res| match res {
                Ok((collection, viewer)) => {
                    let editor = create_rw_signal(TeamEditor::new(collection));
                    view! { <CollectionModal editor mode viewer/> }.into_view()
                }
                Err(err) => error_view(err),
            })}
        </Suspense>
    }
}

#[component]
fn CollectionModal(
    editor: RwSignal<TeamEditor>,
    mode: EditMode,
    viewer: Option<PublicUser>,
) -> impl IntoView {
    let open = create_rw_signal(true);
    let dismiss = Callback::new(move |_: ()| open.set(false));
    let close = move |_| {
        editor.update(|e| e.collection.revert());
        open.set(false);
    };

    // once created, the collection is edited like any other
    let current_mode = move || match mode {
        EditMode::Create if editor.with_untracked(|e| e.collection.canonical().id.is_some()) => {
            EditMode::Update
        }
        mode => mode,
    };

    // a collection being created needs a name before it can be added
    let viewer_id = viewer.as_ref().map(|v| v.id);
    let creating = move || editor.with(|e| e.collection.canonical().id.is_none());
    let rename = move |ev: ev::Event| {
        let name = event_target_value(&ev);
        editor.update(|e| {
            let permissions = Permissions::resolve(e.collection.canonical(), viewer_id);
            if let Ok(mut edit) = e.collection.owner_edit(permissions) {
                edit.rename(&name);
            }
        });
    };

    let title = move || {
        editor.with(|e| match e.collection.canonical().name() {
            "" => "New Collection".to_string(),
            name => name.to_string(),
        })
    };

    view! {
        <h1>{title}</h1>
        <Show
            when=move || open.get()
            fallback=move || view! {
                <button class="btn" on:click=move |_| open.set(true)>"Sharing and Collaboration"</button>
            }
        >
            <div class="modal">
                <div class="modal-header">
                    <p>"Sharing and Collaboration"</p>
                    <button class="modal-close" title="Close" on:click=close>
                        <i class="bi-x-lg"></i>
                    </button>
                </div>
                <Show when=creating>
                    <label class="collection-name">
                        <p class="section-title">"Name"</p>
                        <input
                            type="text"
                            placeholder="Collection name"
                            prop:value=move || editor.with(|e| e.collection.draft().name().to_string())
                            on:input=rename
                        />
                    </label>
                </Show>
                <TeamManagement
                    editor
                    mode=current_mode()
                    viewer=viewer.clone()
                    on_dismiss=dismiss
                />
            </div>
        </Show>
    }
}

/// Every preserved artifact of one link.
#[component]
fn LinkArchivesPage() -> impl IntoView {
    let params = use_params_map();
    let id = move || params.with(id_param).map(LinkID);

    let link = create_resource(id, |id| async move {
        match id {
            Some(id) => get_link(id)
                .await
                .map_err(|err| AppError::Unavailable(server_fn_message(&err))),
            None => Err(AppError::NotFound),
        }
    });

    view! {
        <Suspense fallback=|| view! { <p>"Loading..."</p> }>
            {move || link.get().map(|res| match res {
                Ok(link) => {
                    let rows = link
                        .formats()
                        .into_iter()
                        .map(|format| view! {
                            <PreservedFormatRow
                                name=format.download_name()
                                icon=format.icon()
                                format
                                link=link.clone()
                                downloadable=true
                            />
                        })
                        .collect_view();

                    view! {
                        <h2>{link.name.clone()}</h2>
                        <div class="format-rows">{rows}</div>
                    }
                    .into_view()
                }
                Err(err) => error_view(err),
            })}
        </Suspense>
    }
}

/// Shows one artifact straight from the archive endpoint.
#[component]
fn PreservedViewerPage() -> impl IntoView {
    let params = use_params_map();
    let query = use_query_map();

    let target = move || {
        let id = params.with(id_param).map(LinkID)?;
        let format = query.with(|q| {
            q.get("format")
                .and_then(|f| f.parse().ok())
                .and_then(ArchivedFormat::from_code)
        })?;
        Some((id, format))
    };

    move || match target() {
        Some((id, format)) if format.is_screenshot() => {
            view! { <img class="preserved" src=archive_path(id, format)/> }.into_view()
        }
        Some((id, format)) => {
            view! { <iframe class="preserved" src=archive_path(id, format)></iframe> }.into_view()
        }
        None => error_view(AppError::NotFound),
    }
}

/// The message to show for a failed server call. Backend refusals come
/// through verbatim.
pub fn server_fn_message(err: &ServerFnError) -> String {
    match err {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Persists collections through the server functions below.
pub struct ServerStore;

impl CollectionStore for ServerStore {
    async fn create(&self, collection: &Collection) -> Result<Collection, String> {
        create_collection(collection.clone())
            .await
            .map_err(|err| server_fn_message(&err))
    }

    async fn update(&self, collection: &Collection) -> Result<Collection, String> {
        update_collection(collection.clone())
            .await
            .map_err(|err| server_fn_message(&err))
    }
}

/// Only an unknown user reads as "User not found."; any other failure keeps
/// its own message.
fn lookup_error(err: &ServerFnError) -> AddMemberError {
    let message = server_fn_message(err);
    if message == AddMemberError::NotFound.to_string() {
        AddMemberError::NotFound
    } else {
        AddMemberError::Lookup(message)
    }
}

pub struct ServerDirectory;

impl UserDirectory for ServerDirectory {
    async fn find_by_username(&self, username: &str) -> Result<PublicUser, AddMemberError> {
        get_public_user(UserRef::Username(username.to_string()))
            .await
            .map_err(|err| {
                logging::log!("lookup of {username} failed: {err}");
                lookup_error(&err)
            })
    }
}

#[cfg(feature = "ssr")]
fn backend_client() -> Result<
    (
        std::sync::Arc<backend::BackendClient>,
        backend::Credentials,
    ),
    ServerFnError,
> {
    let api: std::sync::Arc<backend::BackendClient> =
        use_context().ok_or_else(|| ServerFnError::new("backend client is not configured"))?;

    let credentials = use_context::<http::request::Parts>()
        .map(|parts| backend::Credentials::from_parts(&parts))
        .unwrap_or_default();

    Ok((api, credentials))
}

#[server(prefix = "/ui", input = Json)]
pub async fn get_collection(id: CollectionID) -> Result<Collection, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.get_collection(id, &credentials)
        .await
        .map_err(ServerFnError::new)
}

#[server(prefix = "/ui", input = Json)]
pub async fn create_collection(collection: Collection) -> Result<Collection, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.create_collection(&collection, &credentials)
        .await
        .map_err(ServerFnError::new)
}

#[server(prefix = "/ui", input = Json)]
pub async fn update_collection(collection: Collection) -> Result<Collection, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.update_collection(&collection, &credentials)
        .await
        .map_err(ServerFnError::new)
}

#[server(prefix = "/ui", input = Json)]
pub async fn get_public_user(user: UserRef) -> Result<PublicUser, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.get_public_user(&user, &credentials)
        .await
        .map_err(|err| match err {
            backend::ApiErr::NotFound => ServerFnError::new(AddMemberError::NotFound),
            err => ServerFnError::new(err),
        })
}

#[server(prefix = "/ui", input = Json)]
pub async fn get_session_user() -> Result<Option<PublicUser>, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.get_session_user(&credentials)
        .await
        .map_err(ServerFnError::new)
}

#[server(prefix = "/ui", input = Json)]
pub async fn get_link(id: LinkID) -> Result<Link, ServerFnError> {
    let (api, credentials) = backend_client()?;

    api.get_link(id, &credentials)
        .await
        .map_err(ServerFnError::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_messages_pass_through_verbatim() {
        let err = ServerFnError::new("Name already exists");
        assert_eq!(server_fn_message(&err), "Name already exists");
    }

    #[test]
    fn other_failures_keep_their_description() {
        let err: ServerFnError = ServerFnError::Request("connection refused".into());
        assert!(server_fn_message(&err).contains("connection refused"));
    }

    #[test]
    fn only_unknown_users_read_as_not_found() {
        let err = ServerFnError::new(AddMemberError::NotFound);
        assert_eq!(lookup_error(&err), AddMemberError::NotFound);

        let err = ServerFnError::new("Too many requests, slow down.");
        assert_eq!(
            lookup_error(&err),
            AddMemberError::Lookup("Too many requests, slow down.".to_string())
        );

        let err: ServerFnError = ServerFnError::Request("connection refused".into());
        assert!(matches!(
            lookup_error(&err),
            AddMemberError::Lookup(message) if message.contains("connection refused")
        ));
    }

    #[test]
    fn id_params_must_be_numeric() {
        let mut params = ParamsMap::new();
        params.insert("id".into(), "17".into());
        assert_eq!(id_param(&params), Some(17));

        params.insert("id".into(), "new".into());
        assert_eq!(id_param(&params), None);
    }
}
