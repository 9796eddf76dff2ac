use leptos::*;
use leptos_router::use_location;
use wasm_bindgen::JsCast;
use web_sys::HtmlAnchorElement;

use super::{archive_path, is_public_path, viewer_href, ArchivedFormat, Link, LinkID};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] gloo_net::Error),
    #[error("archive endpoint answered {0}")]
    Status(u16),
    #[error("could not create download anchor")]
    Anchor,
}

/// Fetches the artifact once to make sure it exists, then hands the same
/// path to a throwaway anchor so the browser saves it under a fixed name.
pub async fn download_archive(link: LinkID, format: ArchivedFormat) -> Result<(), DownloadError> {
    let path = archive_path(link, format);

    let response = gloo_net::http::Request::get(&path).send().await?;
    if !response.ok() {
        return Err(DownloadError::Status(response.status()));
    }

    let anchor = document()
        .create_element("a")
        .ok()
        .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok())
        .ok_or(DownloadError::Anchor)?;
    anchor.set_href(&path);
    anchor.set_download(format.download_name());
    anchor.click();

    Ok(())
}

#[component]
pub fn PreservedFormatRow(
    #[prop(into)] name: String,
    #[prop(into)] icon: String,
    format: ArchivedFormat,
    link: Link,
    #[prop(optional)] downloadable: bool,
) -> impl IntoView {
    let location = use_location();
    let public = move || location.pathname.with(|p| is_public_path(p));
    let link_id = link.id;

    let download = move |_| {
        spawn_local(async move {
            if let Err(err) = download_archive(link_id, format).await {
                logging::error!("failed to download {:?} of link {link_id}: {err}", format);
            }
        });
    };

    view! {
        <div class="format-row">
            <div class="format-row-label">
                <div class="format-row-icon">
                    <i class=icon></i>
                </div>
                <p>{name}</p>
            </div>

            <div class="format-row-actions">
                <Show when=move || downloadable>
                    <button class="btn btn-sm btn-square" title="Download" on:click=download>
                        <i class="bi-cloud-arrow-down"></i>
                    </button>
                </Show>

                <a
                    href=move || viewer_href(link_id, format, public())
                    target="_blank"
                    rel="noreferrer"
                    class="btn btn-sm btn-square"
                    title="Open"
                >
                    <i class="bi-box-arrow-up-right"></i>
                </a>
            </div>
        </div>
    }
}
