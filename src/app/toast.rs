use std::time::Duration;

use leptos::*;

const AUTO_DISMISS: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Loading,
    Success,
    Error,
}

impl ToastKind {
    fn class(self) -> &'static str {
        match self {
            ToastKind::Loading => "toast toast-loading",
            ToastKind::Success => "toast toast-success",
            ToastKind::Error => "toast toast-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastID(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastID,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    next: u64,
    toasts: Vec<Toast>,
}

impl ToastQueue {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> ToastID {
        let id = ToastID(self.next);
        self.next += 1;
        self.toasts.push(Toast {
            id,
            kind,
            message: message.into(),
        });
        id
    }

    pub fn dismiss(&mut self, id: ToastID) {
        self.toasts.retain(|t| t.id != id);
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }
}

/// Handle to the notification queue, shared through context.
#[derive(Debug, Clone, Copy)]
pub struct Toaster {
    queue: RwSignal<ToastQueue>,
}

impl Toaster {
    /// Stays up until dismissed with the returned id.
    pub fn loading(&self, message: impl Into<String>) -> ToastID {
        self.push(ToastKind::Loading, message.into())
    }

    pub fn success(&self, message: impl Into<String>) {
        self.transient(ToastKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.transient(ToastKind::Error, message.into());
    }

    pub fn dismiss(&self, id: ToastID) {
        self.queue.update(|q| q.dismiss(id));
    }

    fn transient(&self, kind: ToastKind, message: String) {
        let id = self.push(kind, message);
        let queue = self.queue;
        set_timeout(move || queue.update(|q| q.dismiss(id)), AUTO_DISMISS);
    }

    fn push(&self, kind: ToastKind, message: String) -> ToastID {
        // a disposed queue hands back an id nothing will ever match
        self.queue
            .try_update(|q| q.push(kind, message))
            .unwrap_or(ToastID(u64::MAX))
    }
}

pub fn provide_toaster() -> Toaster {
    let toaster = Toaster {
        queue: create_rw_signal(ToastQueue::default()),
    };
    provide_context(toaster);
    toaster
}

/// Falls back to a detached queue so components still render outside `App`.
pub fn use_toaster() -> Toaster {
    use_context::<Toaster>().unwrap_or_else(provide_toaster)
}

#[component]
pub fn Toasts() -> impl IntoView {
    let toaster = use_toaster();

    view! {
        <div class="toasts">
            <For
                each=move || toaster.queue.with(|q| q.toasts().to_vec())
                key=|toast| toast.id
                children=move |toast| view! {
                    <div class=toast.kind.class() role="status">{toast.message}</div>
                }
            />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_hands_out_distinct_ids() {
        let mut queue = ToastQueue::default();
        let loading = queue.push(ToastKind::Loading, "Creating...");
        let error = queue.push(ToastKind::Error, "Name already exists");

        assert_ne!(loading, error);
        queue.dismiss(loading);

        assert_eq!(queue.toasts().len(), 1);
        assert_eq!(queue.toasts()[0].message, "Name already exists");
        assert_eq!(queue.toasts()[0].kind, ToastKind::Error);
    }

    #[test]
    fn dismissing_twice_is_harmless() {
        let mut queue = ToastQueue::default();
        let id = queue.push(ToastKind::Success, "Copied!");

        queue.dismiss(id);
        queue.dismiss(id);

        assert!(queue.toasts().is_empty());
    }
}
