use http::status::StatusCode;
use leptos::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, Serialize, Deserialize)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,
    /// The backend could not serve what the page needs.
    #[error("{0}")]
    Unavailable(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Renders a single page-level failure.
pub fn error_view(error: AppError) -> View {
    let mut outside_errors = Errors::default();
    outside_errors.insert_with_default_key(error);
    view! { <ErrorTemplate outside_errors/> }.into_view()
}

#[component]
pub fn ErrorTemplate(
    #[prop(optional)] outside_errors: Option<Errors>,
    #[prop(optional)] errors: Option<RwSignal<Errors>>,
) -> impl IntoView {
    let errors = match (outside_errors, errors) {
        (Some(e), _) => e,
        (None, Some(e)) => e.get_untracked(),
        (None, None) => Errors::default(),
    };

    // Downcast lets us take a type that implements `std::error::Error`
    let errors: Vec<AppError> = errors
        .into_iter()
        .filter_map(|(_k, v)| v.downcast_ref::<AppError>().cloned())
        .collect();

    // only the first error decides the response status
    #[cfg(feature = "ssr")]
    {
        use leptos_axum::ResponseOptions;
        let response = use_context::<ResponseOptions>();
        if let (Some(response), Some(first)) = (response, errors.first()) {
            response.set_status(first.status_code());
        }
    }

    view! {
        <h1>{if errors.len() > 1 { "Errors" } else { "Error" }}</h1>
        <For
            each=move || { errors.clone().into_iter().enumerate() }
            key=|(index, _error)| *index
            children=move |error| {
                let error_string = error.1.to_string();
                let error_code = error.1.status_code();
                view! {
                    <h2>{error_code.to_string()}</h2>
                    <p>"Error: " {error_string}</p>
                }
            }
        />
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Unavailable("backend down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(AppError::Unavailable("backend down".into()).to_string(), "backend down");
    }
}
