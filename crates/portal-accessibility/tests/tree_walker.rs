//! End-to-end walks over a fake introspection tree: filtering,
//! re-parenting, ordering, classification, and handle lifecycle.

use anyhow::{anyhow, Result};
use portal_accessibility::source::{FocusedElement, IntrospectionSource, UiNode, WindowInfo};
use portal_accessibility::tree::{ElementKind, Rect, SnapshotBuilder, SnapshotStore};
use portal_accessibility::NativeHandle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SCREEN: Rect = Rect::new(0, 0, 1080, 1920);

struct NodeSpec {
    rect: Rect,
    text: Option<String>,
    content_description: Option<String>,
    class_name: Option<String>,
    resource_id: Option<String>,
    clickable: bool,
    checkable: bool,
    editable: bool,
    scrollable: bool,
    children: Vec<Arc<NodeSpec>>,
    /// Fetching any child of this node fails.
    children_unreadable: bool,
}

fn node(rect: Rect, class: &str) -> NodeSpec {
    NodeSpec {
        rect,
        class_name: Some(class.to_string()),
        ..NodeSpec::empty()
    }
}

impl NodeSpec {
    fn empty() -> Self {
        Self {
            rect: Rect::new(0, 0, 0, 0),
            text: None,
            content_description: None,
            class_name: None,
            resource_id: None,
            clickable: false,
            checkable: false,
            editable: false,
            scrollable: false,
            children: Vec::new(),
            children_unreadable: false,
        }
    }

    fn text(mut self, t: &str) -> Self {
        self.text = Some(t.to_string());
        self
    }

    fn content_description(mut self, d: &str) -> Self {
        self.content_description = Some(d.to_string());
        self
    }

    fn resource_id(mut self, r: &str) -> Self {
        self.resource_id = Some(r.to_string());
        self
    }

    fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    fn checkable(mut self) -> Self {
        self.checkable = true;
        self
    }

    fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    fn children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    fn children_unreadable(mut self) -> Self {
        self.children_unreadable = true;
        self
    }
}

/// Handle double that tracks the shared live count.
struct FakeHandle {
    live: Arc<AtomicUsize>,
}

impl NativeHandle for FakeHandle {
    fn release(self: Box<Self>) -> Result<()> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeNode {
    spec: Arc<NodeSpec>,
    live: Arc<AtomicUsize>,
}

impl UiNode for FakeNode {
    fn bounds(&self) -> Rect {
        self.spec.rect
    }
    fn text(&self) -> Option<String> {
        self.spec.text.clone()
    }
    fn content_description(&self) -> Option<String> {
        self.spec.content_description.clone()
    }
    fn class_name(&self) -> Option<String> {
        self.spec.class_name.clone()
    }
    fn resource_id(&self) -> Option<String> {
        self.spec.resource_id.clone()
    }
    fn is_clickable(&self) -> bool {
        self.spec.clickable
    }
    fn is_checkable(&self) -> bool {
        self.spec.checkable
    }
    fn is_editable(&self) -> bool {
        self.spec.editable
    }
    fn is_scrollable(&self) -> bool {
        self.spec.scrollable
    }
    fn child_count(&self) -> usize {
        self.spec.children.len()
    }
    fn child(&self, index: usize) -> Result<Box<dyn UiNode>> {
        if self.spec.children_unreadable {
            return Err(anyhow!("child {} went away", index));
        }
        Ok(Box::new(FakeNode {
            spec: self.spec.children[index].clone(),
            live: self.live.clone(),
        }))
    }
    fn duplicate_handle(&self) -> Result<Box<dyn NativeHandle>> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            live: self.live.clone(),
        }))
    }
}

struct FakeSource {
    root: Option<Arc<NodeSpec>>,
    live: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(root: Option<NodeSpec>) -> Self {
        Self {
            root: root.map(Arc::new),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl IntrospectionSource for FakeSource {
    fn active_root(&self) -> Result<Option<Box<dyn UiNode>>> {
        Ok(self.root.clone().map(|spec| {
            Box::new(FakeNode {
                spec,
                live: self.live.clone(),
            }) as Box<dyn UiNode>
        }))
    }
    fn windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(Vec::new())
    }
    fn focused_node(&self) -> Result<Option<FocusedElement>> {
        Ok(None)
    }
    fn foreground_package(&self) -> Option<String> {
        Some("com.example.app".to_string())
    }
    fn app_label(&self, _package: &str) -> Option<String> {
        None
    }
}

fn builder() -> SnapshotBuilder {
    SnapshotBuilder::new(SCREEN)
}

#[test]
fn preorder_overlay_indices_are_sequential() {
    // root -> (a -> (a1, a2), b)
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
        node(Rect::new(0, 0, 1080, 900), "android.widget.LinearLayout").children(vec![
            node(Rect::new(0, 0, 500, 100), "android.widget.TextView").text("a1"),
            node(Rect::new(0, 100, 500, 200), "android.widget.TextView").text("a2"),
        ]),
        node(Rect::new(0, 900, 1080, 1920), "android.widget.Button")
            .text("b")
            .clickable(),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    assert_eq!(snap.element_count(), 5);
    let indices: Vec<u32> = snap
        .preorder_indices()
        .into_iter()
        .map(|i| snap.elements[i].overlay_index)
        .collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);

    let texts: Vec<&str> = snap
        .preorder_indices()
        .into_iter()
        .map(|i| snap.elements[i].display_text.as_str())
        .collect();
    assert_eq!(texts, vec!["FrameLayout", "LinearLayout", "a1", "a2", "b"]);
}

#[test]
fn tiny_and_offscreen_elements_are_filtered() {
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
        // 5x5: width must exceed the minimum strictly.
        node(Rect::new(0, 0, 5, 5), "android.view.View"),
        // Entirely below the screen.
        node(Rect::new(0, 2000, 400, 2400), "android.view.View"),
        // Qualifies.
        node(Rect::new(0, 0, 200, 200), "android.widget.TextView").text("kept"),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    assert_eq!(snap.element_count(), 2);
    assert!(snap.elements.iter().any(|e| e.display_text == "kept"));
}

#[test]
fn children_of_filtered_nodes_reparent_to_nearest_kept_ancestor() {
    // The middle wrapper is 1px tall and fails the size filter; its child
    // must attach to the root, not vanish.
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![node(
        Rect::new(0, 0, 1080, 1),
        "android.widget.LinearLayout",
    )
    .children(vec![
        node(Rect::new(0, 0, 300, 100), "android.widget.Button")
            .text("Submit")
            .clickable(),
    ])]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    assert_eq!(snap.element_count(), 2);
    let root_idx = snap.roots[0];
    assert_eq!(snap.elements[root_idx].children.len(), 1);
    let child_idx = snap.elements[root_idx].children[0];
    assert_eq!(snap.elements[child_idx].display_text, "Submit");
    assert_eq!(snap.elements[child_idx].parent, Some(root_idx));
}

#[test]
fn filtered_root_promotes_children_to_snapshot_roots() {
    let root = node(Rect::new(0, 0, 1080, 1), "android.widget.FrameLayout").children(vec![
        node(Rect::new(0, 0, 500, 500), "android.widget.TextView").text("one"),
        node(Rect::new(0, 500, 500, 1000), "android.widget.TextView").text("two"),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    assert_eq!(snap.roots.len(), 2);
    assert!(snap.roots.iter().all(|&r| snap.elements[r].parent.is_none()));
}

#[test]
fn display_text_priority_chain() {
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
        node(Rect::new(0, 0, 200, 100), "android.widget.TextView")
            .text("has text")
            .content_description("ignored desc"),
        node(Rect::new(0, 100, 200, 200), "android.widget.ImageView")
            .content_description("a photo"),
        node(Rect::new(0, 200, 200, 300), "android.view.View")
            .resource_id("com.example.app:id/submit_button"),
        node(Rect::new(0, 300, 200, 400), "android.widget.ProgressBar"),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    let by_order: Vec<&str> = snap
        .preorder_indices()
        .into_iter()
        .skip(1) // root
        .map(|i| snap.elements[i].display_text.as_str())
        .collect();
    assert_eq!(
        by_order,
        vec!["has text", "a photo", "submit_button", "ProgressBar"]
    );
}

#[test]
fn classification_priority() {
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
        // Clickable wins even with text.
        node(Rect::new(0, 0, 200, 100), "android.widget.Button")
            .text("OK")
            .clickable(),
        node(Rect::new(0, 100, 200, 200), "android.widget.CheckBox").checkable(),
        node(Rect::new(0, 200, 200, 300), "android.widget.EditText").editable(),
        node(Rect::new(0, 300, 200, 400), "android.widget.TextView").text("label"),
        node(Rect::new(0, 400, 200, 500), "android.widget.ScrollView").scrollable(),
        node(Rect::new(0, 500, 200, 600), "android.view.View"),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    let kinds: Vec<ElementKind> = snap
        .preorder_indices()
        .into_iter()
        .skip(1)
        .map(|i| snap.elements[i].kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Clickable,
            ElementKind::Checkable,
            ElementKind::Input,
            ElementKind::Text,
            ElementKind::Container,
            ElementKind::View,
        ]
    );
}

#[test]
fn no_foreground_content_yields_empty_snapshot() {
    let source = FakeSource::new(None);
    let snap = builder().build(&source);
    assert!(snap.is_empty());
    assert_eq!(snap.live_handle_count(), 0);
}

#[test]
fn unreadable_subtree_is_skipped_but_siblings_survive() {
    let root = node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
        node(Rect::new(0, 0, 500, 500), "android.widget.LinearLayout")
            .children(vec![node(
                Rect::new(0, 0, 100, 100),
                "android.widget.TextView",
            )
            .text("never seen")])
            .children_unreadable(),
        node(Rect::new(0, 500, 500, 1000), "android.widget.TextView").text("survivor"),
    ]);
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    // Root, the unreadable container itself, and the sibling. The
    // container's children never materialize.
    assert_eq!(snap.element_count(), 3);
    assert!(snap.elements.iter().any(|e| e.display_text == "survivor"));
    assert!(!snap.elements.iter().any(|e| e.display_text == "never seen"));
    // Indices still have no gaps.
    let mut indices: Vec<u32> = snap.elements.iter().map(|e| e.overlay_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[test]
fn installing_a_new_snapshot_releases_the_old_handles() {
    let tree = || {
        node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![
            node(Rect::new(0, 0, 500, 500), "android.widget.TextView").text("a"),
            node(Rect::new(0, 500, 500, 1000), "android.widget.TextView").text("b"),
        ])
    };
    let source = FakeSource::new(Some(tree()));
    let live = source.live.clone();
    let store = SnapshotStore::new();

    let first = store.install(builder().build(&source));
    assert_eq!(live.load(Ordering::SeqCst), 3);
    assert_eq!(first.live_handle_count(), 3);

    let second = store.install(builder().build(&source));
    // Old snapshot drained, new one fully live.
    assert_eq!(live.load(Ordering::SeqCst), 3);
    assert_eq!(first.live_handle_count(), 0);
    assert_eq!(second.live_handle_count(), 3);

    store.shutdown();
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn single_button_snapshot() {
    let root = node(Rect::new(10, 20, 110, 60), "android.widget.Button")
        .text("OK")
        .clickable();
    let source = FakeSource::new(Some(root));
    let snap = builder().build(&source);

    assert_eq!(snap.element_count(), 1);
    assert_eq!(snap.roots, vec![0]);
    let button = &snap.elements[0];
    assert_eq!(button.overlay_index, 1);
    assert_eq!(button.kind, ElementKind::Clickable);
    assert_eq!(button.display_text, "OK");
    assert_eq!(button.class_name, "Button");
    assert!(button.parent.is_none());
    assert!(button.children.is_empty());
}

#[test]
fn element_ids_are_stable_across_rebuilds() {
    let tree = || {
        node(Rect::new(0, 0, 1080, 1920), "android.widget.FrameLayout").children(vec![node(
            Rect::new(0, 0, 300, 100),
            "android.widget.Button",
        )
        .text("Submit")
        .clickable()])
    };
    let source = FakeSource::new(Some(tree()));
    let a = builder().build(&source);
    let b = builder().build(&source);

    let ids_a: Vec<u64> = a.elements.iter().map(|e| e.id).collect();
    let ids_b: Vec<u64> = b.elements.iter().map(|e| e.id).collect();
    assert_eq!(ids_a, ids_b);
}
