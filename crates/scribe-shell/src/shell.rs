//! The editor shell: composition root of the editing/upload core.
//!
//! Owns the drag state and the picker, wires the adapters' candidate
//! stream into the upload coordinator, and is the sole hand-off point to
//! the persistence layer: registered change listeners receive the
//! serialized markup after every document mutation, including asynchronous
//! insertions. Debouncing is the caller's policy, not ours.

use std::sync::{Arc, Mutex};

use scribe_common::ComposerConfig;
use scribe_editor_core::{
    Command, CommandKind, Document, DocumentSnapshot, EventResponse, Selection, ToolbarState,
    toolbar,
};
use scribe_uploads::{
    AssetStore, CoordinatorEvents, Notice, TaskId, UploadCoordinator, UploadState, UploadTask,
};

use crate::adapters::{
    DragEvent, PasteEvent, PickerAdapter, PickerEvent, candidates_from_drop, candidates_from_paste,
};
use crate::drag::DragState;

/// Callback invoked with the serialized markup after each mutation.
pub type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

pub struct EditorShell<S: AssetStore> {
    document: Arc<Mutex<Document>>,
    drag: DragState,
    picker: PickerAdapter,
    coordinator: UploadCoordinator<S>,
    events: CoordinatorEvents,
    listeners: Vec<ChangeListener>,
    /// Last document version the listeners were told about.
    notified_version: u64,
    pending_notices: Vec<Notice>,
}

impl<S: AssetStore> EditorShell<S> {
    /// A shell over an empty document.
    pub fn new(store: Arc<S>, config: ComposerConfig) -> Self {
        Self::with_document(store, config, Document::new())
    }

    /// A shell over a loaded document (the persistence layer deserializes
    /// and hands the result here).
    pub fn with_document(store: Arc<S>, config: ComposerConfig, document: Document) -> Self {
        let document = Arc::new(Mutex::new(document));
        let (coordinator, events) = UploadCoordinator::new(store, document.clone(), config);
        Self {
            document,
            drag: DragState::new(),
            picker: PickerAdapter::new(),
            coordinator,
            events,
            listeners: Vec::new(),
            notified_version: 0,
            pending_notices: Vec::new(),
        }
    }

    /// Register a persistence listener.
    pub fn on_change(&mut self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn document(&self) -> Arc<Mutex<Document>> {
        self.document.clone()
    }

    pub fn uploads(&self) -> &UploadCoordinator<S> {
        &self.coordinator
    }

    // === Editing ===

    /// Apply an editor command, notifying listeners if the tree changed.
    pub fn apply(&mut self, cmd: Command) -> DocumentSnapshot {
        let snapshot = {
            let mut doc = self.document.lock().unwrap_or_else(|p| p.into_inner());
            doc.apply(cmd)
        };
        if snapshot.changed {
            self.notified_version = snapshot.version;
            for listener in &self.listeners {
                listener(&snapshot.markup);
            }
        }
        snapshot
    }

    /// Move the selection. Selection changes alone are not persisted.
    pub fn set_selection(&mut self, selection: Selection) {
        self.document
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .set_selection(selection);
    }

    /// Current toolbar projection for the selection.
    pub fn toolbar_state(&self) -> ToolbarState {
        let doc = self.document.lock().unwrap_or_else(|p| p.into_inner());
        scribe_editor_core::derive_state(&doc)
    }

    /// Pointer-down on a toolbar control: consumed, so the document keeps
    /// focus until the command has run.
    pub fn on_toolbar_pointer_down(&self) -> EventResponse {
        toolbar::on_pointer_down()
    }

    /// A toolbar control was clicked. The image control is handled by the
    /// host (it opens the picker, which comes back via `on_picker_event`).
    pub fn on_toolbar_click(&mut self, kind: CommandKind) {
        let state = self.toolbar_state();
        if let Some(cmd) = scribe_editor_core::command_for(kind, &state) {
            self.apply(cmd);
        }
    }

    // === Input channels ===

    /// File-picker change event.
    pub fn on_picker_event(&mut self, event: PickerEvent) -> Option<TaskId> {
        let candidate = self.picker.on_select(event)?;
        // Clear so re-selecting the same file re-triggers the pipeline.
        self.picker.clear();
        Some(self.coordinator.submit(candidate))
    }

    /// Drag-related event. Every one of them is consumed: the browser's
    /// default navigate-to-dropped-file behavior must never run.
    pub fn on_drag_event(&mut self, event: DragEvent) -> (EventResponse, Vec<TaskId>) {
        match event {
            DragEvent::Enter => {
                self.drag.enter();
                (EventResponse::Consumed, Vec::new())
            }
            DragEvent::Leave => {
                self.drag.leave();
                (EventResponse::Consumed, Vec::new())
            }
            DragEvent::Over => (EventResponse::Consumed, Vec::new()),
            DragEvent::Drop(items) => {
                self.drag.reset();
                let ids: Vec<TaskId> = candidates_from_drop(items)
                    .into_iter()
                    .map(|candidate| self.coordinator.submit(candidate))
                    .collect();
                tracing::debug!(files = ids.len(), "drop dispatched to upload pipeline");
                (EventResponse::Consumed, ids)
            }
        }
    }

    /// Clipboard paste event. Image items enter the pipeline; anything else
    /// is left to default paste handling.
    pub fn on_paste_event(&mut self, event: PasteEvent) -> (EventResponse, Vec<TaskId>) {
        let (candidates, response) = candidates_from_paste(event);
        let ids = candidates
            .into_iter()
            .map(|candidate| self.coordinator.submit(candidate))
            .collect();
        (response, ids)
    }

    // === Derived UI state ===

    /// The full-viewport drop target overlay.
    pub fn drop_overlay_visible(&self) -> bool {
        self.drag.is_dragging()
    }

    /// The floating contextual menu: non-empty selection, and not while a
    /// drag is in flight.
    pub fn context_menu_visible(&self) -> bool {
        let doc = self.document.lock().unwrap_or_else(|p| p.into_inner());
        !doc.selection().is_collapsed() && !self.drag.is_dragging()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Uploads that are still in flight, for the transient progress
    /// indicators.
    pub fn active_uploads(&self) -> Vec<UploadTask> {
        self.coordinator
            .tasks()
            .into_iter()
            .filter(|task| !task.is_terminal())
            .collect()
    }

    // === Pipeline events ===

    /// Drain pending pipeline events: notify listeners of asynchronous
    /// insertions and collect user-visible notices. Hosts call this from
    /// their event loop tick.
    pub fn pump(&mut self) {
        let mut inserted = false;
        while let Ok(update) = self.events.updates.try_recv() {
            if update.state == UploadState::Done {
                inserted = true;
            }
        }
        while let Ok(notice) = self.events.notices.try_recv() {
            self.pending_notices.push(notice);
        }
        if inserted {
            self.flush_document_change();
        }
    }

    /// Notices accumulated since the last call (validation and gateway
    /// failures to surface to the user).
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending_notices)
    }

    /// Fire listeners if the document moved past the last notified version.
    fn flush_document_change(&mut self) {
        let (version, markup) = {
            let doc = self.document.lock().unwrap_or_else(|p| p.into_inner());
            (doc.version(), doc.serialize())
        };
        if version != self.notified_version {
            self.notified_version = version;
            for listener in &self.listeners {
                listener(&markup);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ClipboardItem, DataTransferItem, FilePayload};
    use bytes::Bytes;
    use scribe_editor_core::Position;
    use scribe_uploads::MemoryStore;
    use url::Url;

    fn shell() -> EditorShell<MemoryStore> {
        let store = Arc::new(MemoryStore::new(
            Url::parse("https://cdn.example/blog-images/").unwrap(),
        ));
        EditorShell::new(store, ComposerConfig::default())
    }

    fn png_payload(name: &str) -> FilePayload {
        FilePayload {
            bytes: Bytes::from(vec![0u8; 64]),
            name: name.into(),
            mime_type: "image/png".into(),
        }
    }

    async fn wait_done(shell: &EditorShell<MemoryStore>, id: TaskId) {
        let mut rx = shell.uploads().subscribe(id).expect("task exists");
        let task = rx.wait_for(UploadTask::is_terminal).await.unwrap().clone();
        assert_eq!(task.state, UploadState::Done);
    }

    #[test]
    fn test_on_change_fires_on_edit() {
        let mut shell = shell();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        shell.on_change(move |markup| sink.lock().unwrap().push(markup.to_owned()));

        shell.apply(Command::InsertText("hello".into()));
        assert_eq!(seen.lock().unwrap().as_slice(), ["<p>hello</p>".to_owned()]);

        // A selection move alone must not notify the persistence layer.
        shell.set_selection(Selection::collapsed(Position::new(0, 0, 1)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_toolbar_click_round_trip() {
        let mut shell = shell();
        shell.apply(Command::InsertText("hello".into()));
        shell.set_selection(Selection::new(
            Position::new(0, 0, 0),
            Position::new(0, 0, 5),
        ));

        assert!(shell.on_toolbar_pointer_down().is_consumed());
        shell.on_toolbar_click(CommandKind::Bold);
        assert!(shell.toolbar_state().get(CommandKind::Bold).active);

        // Clicking again toggles it back off.
        shell.on_toolbar_click(CommandKind::Bold);
        assert!(!shell.toolbar_state().get(CommandKind::Bold).active);
    }

    #[test]
    fn test_drag_overlay_and_context_menu() {
        let mut shell = shell();
        shell.apply(Command::InsertText("hello".into()));
        shell.set_selection(Selection::new(
            Position::new(0, 0, 0),
            Position::new(0, 0, 5),
        ));
        assert!(shell.context_menu_visible());

        let (response, _) = shell.on_drag_event(DragEvent::Enter);
        assert!(response.is_consumed());
        assert!(shell.drop_overlay_visible());
        // The contextual menu hides while dragging.
        assert!(!shell.context_menu_visible());

        shell.on_drag_event(DragEvent::Leave);
        assert!(!shell.drop_overlay_visible());
        assert!(shell.context_menu_visible());
    }

    #[test]
    fn test_drag_over_is_consumed() {
        let mut shell = shell();
        let (response, ids) = shell.on_drag_event(DragEvent::Over);
        assert!(response.is_consumed());
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_multi_file_drop_spawns_independent_tasks() {
        let mut shell = shell();
        shell.on_drag_event(DragEvent::Enter);

        let (response, ids) = shell.on_drag_event(DragEvent::Drop(vec![
            DataTransferItem::File(png_payload("a.png")),
            DataTransferItem::File(png_payload("b.png")),
            DataTransferItem::File(png_payload("c.png")),
        ]));
        assert!(response.is_consumed());
        assert_eq!(ids.len(), 3);
        assert_eq!(shell.drag_state().counter(), 0);

        for id in &ids {
            wait_done(&shell, *id).await;
        }

        let doc = shell.document();
        let doc = doc.lock().unwrap();
        let image_count = doc
            .blocks()
            .iter()
            .filter(|b| !b.is_textual())
            .count();
        assert_eq!(image_count, 3);
    }

    #[tokio::test]
    async fn test_paste_image_inserts_and_notifies() {
        let mut shell = shell();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        shell.on_change(move |markup| sink.lock().unwrap().push(markup.to_owned()));

        let (response, ids) = shell.on_paste_event(PasteEvent {
            items: vec![
                ClipboardItem {
                    mime_type: "text/plain".into(),
                    payload: Bytes::from_static(b"not ours"),
                },
                ClipboardItem {
                    mime_type: "image/png".into(),
                    payload: Bytes::from(vec![0u8; 64]),
                },
            ],
        });
        assert!(response.is_consumed());
        assert_eq!(ids.len(), 1);

        wait_done(&shell, ids[0]).await;
        shell.pump();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("<img src=\"https://cdn.example/blog-images/"));
        assert!(seen[0].contains("alt=\"pasted.png\""));
    }

    #[tokio::test]
    async fn test_picker_end_to_end() {
        let mut shell = shell();
        shell.apply(Command::InsertText("intro".into()));
        shell.set_selection(Selection::collapsed(Position::new(0, 0, 5)));

        let id = shell
            .on_picker_event(PickerEvent {
                file: Some(png_payload("photo.png")),
            })
            .expect("candidate submitted");
        wait_done(&shell, id).await;

        let doc = shell.document();
        let doc = doc.lock().unwrap();
        let markup = doc.serialize();
        assert!(markup.starts_with("<p>intro</p><img src=\"https://cdn.example/blog-images/"));
        assert!(markup.contains("title=\"photo.png\""));
        // Cursor immediately after the image.
        assert_eq!(doc.cursor(), Position::start_of(2));
    }

    #[tokio::test]
    async fn test_rejected_candidate_surfaces_notice() {
        let mut shell = shell();
        let (_, ids) = shell.on_drag_event(DragEvent::Drop(vec![DataTransferItem::File(
            FilePayload {
                bytes: Bytes::from(vec![0u8; 6_000_000]),
                name: "huge.png".into(),
                mime_type: "image/png".into(),
            },
        )]));
        assert_eq!(ids.len(), 1);
        assert_eq!(
            shell.uploads().snapshot(ids[0]).unwrap().state,
            UploadState::Failed
        );

        shell.pump();
        let notices = shell.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("limit"));
    }

    #[tokio::test]
    async fn test_active_uploads_drain() {
        let mut shell = shell();
        let (_, ids) = shell.on_drag_event(DragEvent::Drop(vec![DataTransferItem::File(
            png_payload("a.png"),
        )]));
        wait_done(&shell, ids[0]).await;
        shell.pump();
        assert!(shell.active_uploads().is_empty());
    }
}
