use std::cell::RefCell;
use std::rc::Rc;

use folio::document::ManifestDocument;
use folio::{
    Attributes, CommandSender, DocumentInfo, Layer, Localization, PageSlot, Plugin,
    PluginContext, Result, Size, Viewer, ViewerError, ViewerOptions, ViewerSnapshot, ZoomLevel,
};

type Log = Rc<RefCell<Vec<String>>>;

fn viewer() -> Viewer {
    let doc = ManifestDocument::uniform(10, Size::new(100.0, 200.0));
    Viewer::new(
        Box::new(doc),
        ViewerOptions {
            container: Size::new(300.0, 300.0),
            ..ViewerOptions::default()
        },
    )
    .unwrap()
}

/// Records every hook it sees
struct Tracer {
    log: Log,
}

impl Plugin for Tracer {
    fn name(&self) -> &str {
        "tracer"
    }

    fn install(&mut self, _ctx: &PluginContext) -> Result<()> {
        self.log.borrow_mut().push("install".into());
        Ok(())
    }

    fn uninstall(&mut self) {
        self.log.borrow_mut().push("uninstall".into());
    }

    fn on_document_load(&mut self, info: &DocumentInfo) {
        self.log
            .borrow_mut()
            .push(format!("load {} pages", info.page_count));
    }

    fn on_page_change(&mut self, page: usize) {
        self.log.borrow_mut().push(format!("page {page}"));
    }

    fn on_viewer_state_change(&mut self, snapshot: ViewerSnapshot) -> ViewerSnapshot {
        self.log
            .borrow_mut()
            .push(format!("state scale {}", snapshot.scale));
        snapshot
    }
}

#[test]
fn hooks_fire_in_order() {
    let log = Log::default();
    let mut viewer = viewer();
    viewer
        .install_plugin(Box::new(Tracer { log: log.clone() }))
        .unwrap();

    viewer.jump_to_page(3).unwrap();
    viewer.zoom(ZoomLevel::Scale(2.0));
    drop(viewer);

    assert_eq!(
        *log.borrow(),
        vec![
            "install",
            "load 10 pages",
            "state scale 1",
            "state scale 1",
            "page 3",
            "state scale 2",
            "uninstall",
        ]
    );
}

#[test]
fn duplicate_plugins_are_rejected() {
    let log = Log::default();
    let mut viewer = viewer();
    viewer
        .install_plugin(Box::new(Tracer { log: log.clone() }))
        .unwrap();

    let err = viewer
        .install_plugin(Box::new(Tracer { log: log.clone() }))
        .unwrap_err();
    assert!(matches!(err, ViewerError::DuplicatePlugin(_)));
    assert_eq!(viewer.plugin_names().collect::<Vec<_>>(), vec!["tracer"]);

    assert!(viewer.uninstall_plugin("tracer"));
    assert!(!viewer.uninstall_plugin("tracer"));
    assert_eq!(log.borrow().last().map(String::as_str), Some("uninstall"));
}

/// Highlights one page and marks the viewer as annotated
struct Highlighter {
    page: usize,
}

impl Plugin for Highlighter {
    fn name(&self) -> &str {
        "highlighter"
    }

    fn viewer_attributes(&self, attrs: &mut Attributes) {
        attrs.add_class("annotated").data("highlights", 1);
    }

    fn page_attributes(&self, slot: &PageSlot, attrs: &mut Attributes) {
        if slot.index == self.page {
            attrs.add_class("highlighted").add_style("outline", "2px solid");
        }
    }

    fn render_page_layers(&self, slot: &PageSlot) -> Vec<Layer> {
        if slot.index == self.page {
            vec![Layer::new("highlights").with_content("10,10,50,20")]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn plugins_decorate_the_frame() {
    let mut viewer = viewer();
    viewer
        .install_plugin(Box::new(Highlighter { page: 1 }))
        .unwrap();

    let frame = viewer.frame();
    assert!(frame.attributes.has_class("folio-viewer"));
    assert!(frame.attributes.has_class("annotated"));
    assert_eq!(frame.attributes.get("data-highlights"), Some("1"));
    assert_eq!(frame.attributes.get("aria-label"), Some("Document viewer"));

    let page = frame.page(1).unwrap();
    assert!(page.attributes.has_class("folio-page"));
    assert!(page.attributes.has_class("highlighted"));
    let style = page.attributes.get("style").unwrap();
    assert!(style.contains("top: 220px"));
    assert!(style.contains("outline: 2px solid"));
    assert_eq!(page.layers.len(), 1);
    assert_eq!(page.layers[0].content, "10,10,50,20");

    let other = frame.page(0).unwrap();
    assert!(!other.attributes.has_class("highlighted"));
    assert!(other.layers.is_empty());
}

#[test]
fn page_labels_are_localized() {
    let localization =
        Localization::from_json(r#"{"core": {"pageLabel": "Seite {pageIndex}"}}"#).unwrap();
    let viewer = viewer().with_localization(localization);

    let frame = viewer.frame();
    assert_eq!(
        frame.page(0).unwrap().attributes.get("aria-label"),
        Some("Seite 1")
    );
    // Untouched keys keep the built-in text
    assert_eq!(frame.attributes.get("aria-label"), Some("Document viewer"));
}

/// Sends a jump as soon as it is installed
struct Navigator {
    target: usize,
}

impl Plugin for Navigator {
    fn name(&self) -> &str {
        "navigator"
    }

    fn install(&mut self, ctx: &PluginContext) -> Result<()> {
        let commands: &CommandSender = &ctx.commands;
        assert!(commands.jump_to_page(self.target));
        Ok(())
    }
}

#[test]
fn plugin_commands_run_when_drained() {
    let mut viewer = viewer();
    viewer
        .install_plugin(Box::new(Navigator { target: 4 }))
        .unwrap();

    // Nothing happens until the viewer drains the queue
    assert_eq!(viewer.current_page(), 0);
    assert_eq!(viewer.drain_plugin_commands(), 1);
    assert_eq!(viewer.current_page(), 4);
    assert_eq!(viewer.drain_plugin_commands(), 0);
}

#[test]
fn failing_plugin_commands_are_skipped() {
    let mut viewer = viewer();
    viewer
        .install_plugin(Box::new(Navigator { target: 40 }))
        .unwrap();

    assert_eq!(viewer.drain_plugin_commands(), 1);
    assert_eq!(viewer.current_page(), 0);
}

/// Reports a different document name to the plugins after it
struct Renamer;

impl Plugin for Renamer {
    fn name(&self) -> &str {
        "renamer"
    }

    fn on_viewer_state_change(&mut self, mut snapshot: ViewerSnapshot) -> ViewerSnapshot {
        snapshot.document = "renamed".into();
        snapshot
    }
}

#[test]
fn snapshots_flow_through_the_plugin_chain() {
    let mut viewer = viewer();
    viewer.install_plugin(Box::new(Renamer)).unwrap();
    viewer.jump_to_page(2).unwrap();

    assert_eq!(viewer.snapshot().document, "renamed");
    assert_eq!(viewer.snapshot().current_page, 2);
    // The viewer's own state is untouched
    assert_eq!(viewer.current_page(), 2);
}
