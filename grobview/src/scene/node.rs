//! Scene tree nodes
use super::{Content, MeshHandle};
use crate::{
    BoundingBox,
    render::{Gpu, View},
};

/// A node in the scene tree
///
/// Each node exclusively owns its children and its content.  Traversal is
/// depth-first, visiting a node before its children.
pub struct Node {
    name: String,
    content: Option<Box<dyn Content>>,
    children: Vec<Node>,
    selected: bool,
}

impl Node {
    /// Builds an empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
            children: vec![],
            selected: false,
        }
    }

    /// Builds a node holding the given content, named after it
    pub fn with_content(content: Box<dyn Content>) -> Self {
        Self {
            name: content.name(),
            content: Some(content),
            children: vec![],
            selected: false,
        }
    }

    /// Returns the node's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the node's content, if any
    pub fn content(&self) -> Option<&dyn Content> {
        self.content.as_deref()
    }

    /// Returns the node's content mutably, if any
    pub fn content_mut(&mut self) -> Option<&mut (dyn Content + 'static)> {
        self.content.as_deref_mut()
    }

    /// Replaces the node's content, returning the previous one
    pub fn set_content(
        &mut self,
        content: Option<Box<dyn Content>>,
    ) -> Option<Box<dyn Content>> {
        std::mem::replace(&mut self.content, content)
    }

    /// Returns the node's children
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns the node's children, mutably
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Appends a child, returning a reference to it
    pub fn add_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    /// Removes and returns the child at the given index
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn remove_child(&mut self, i: usize) -> Node {
        self.children.remove(i)
    }

    /// Checks whether the node is selected in the GUI
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Selects or deselects the node
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Visits this node, then every descendant, depth-first
    pub fn traverse<F: FnMut(&Node)>(&self, mut f: F) {
        self.traverse_inner(&mut f)
    }

    fn traverse_inner<F: FnMut(&Node)>(&self, f: &mut F) {
        f(self);
        self.traverse_children_inner(f);
    }

    /// Visits every descendant (but not this node), depth-first
    pub fn traverse_children<F: FnMut(&Node)>(&self, mut f: F) {
        self.traverse_children_inner(&mut f)
    }

    fn traverse_children_inner<F: FnMut(&Node)>(&self, f: &mut F) {
        for c in &self.children {
            c.traverse_inner(f);
        }
    }

    /// Visits this node, then every descendant, depth-first, mutably
    pub fn traverse_mut<F: FnMut(&mut Node)>(&mut self, mut f: F) {
        self.traverse_mut_inner(&mut f)
    }

    fn traverse_mut_inner<F: FnMut(&mut Node)>(&mut self, f: &mut F) {
        f(self);
        for c in &mut self.children {
            c.traverse_mut_inner(f);
        }
    }

    /// Returns the number of nodes in this subtree (including this one)
    pub fn len(&self) -> usize {
        let mut n = 0;
        self.traverse(|_| n += 1);
        n
    }

    /// Draws this node's content, then its children
    pub fn render(&mut self, view: &View, gpu: &mut dyn Gpu) {
        self.traverse_mut(|n| {
            if let Some(c) = &mut n.content {
                c.render(view, gpu);
            }
        })
    }

    /// Releases GPU resources held by every content in this subtree
    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        self.traverse_mut(|n| {
            if let Some(c) = &mut n.content {
                c.release(gpu);
            }
        })
    }

    /// Returns the union of this node's and its descendants' bounding boxes
    ///
    /// Returns `None` if no content in the subtree has a bounding box.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut out = None;
        self.traverse(|n| {
            let b = n.content.as_ref().and_then(|c| c.bounding_box());
            out = crate::union_bbox(out, b);
        });
        out
    }

    /// Returns handles to the meshes of every selected node in the subtree
    pub fn selected_meshes(&self) -> Vec<MeshHandle> {
        let mut out = vec![];
        self.traverse(|n| {
            if n.selected {
                out.extend(n.content.as_ref().and_then(|c| c.mesh_handle()));
            }
        });
        out
    }

    /// Draws a collapsing header for this node and (nested) its children
    pub fn do_imgui(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new(self.name.as_str())
            .default_open(true)
            .show(ui, |ui| {
                ui.checkbox(&mut self.selected, "Selected");
                if let Some(c) = &mut self.content {
                    if c.has_imgui() {
                        c.do_imgui(ui);
                    }
                }
                for (i, child) in self.children.iter_mut().enumerate() {
                    ui.push_id(i, |ui| child.do_imgui(ui));
                }
            });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::gpu::recording::RecordingGpu;
    use nalgebra::Point3;

    /// Content with a fixed box that logs its render calls by name
    struct Dummy {
        name: &'static str,
        bbox: Option<BoundingBox>,
    }

    impl Content for Dummy {
        fn name(&self) -> String {
            self.name.to_owned()
        }
        fn bounding_box(&self) -> Option<BoundingBox> {
            self.bbox
        }
        fn render(&mut self, _view: &View, gpu: &mut dyn Gpu) {
            gpu.draw_triangles(self.name.len());
        }
    }

    fn dummy(name: &'static str, lo: f32, hi: f32) -> Node {
        Node::with_content(Box::new(Dummy {
            name,
            bbox: Some(BoundingBox::new(
                Point3::new(lo, lo, lo),
                Point3::new(hi, hi, hi),
            )),
        }))
    }

    fn tree() -> Node {
        let mut root = Node::new("root");
        let a = root.add_child(dummy("a", 0.0, 1.0));
        a.add_child(dummy("aa", -2.0, 0.5));
        root.add_child(dummy("b", 3.0, 4.0));
        root
    }

    #[test]
    fn test_traversal_order() {
        let t = tree();
        let mut names = vec![];
        t.traverse(|n| names.push(n.name().to_owned()));
        assert_eq!(names, ["root", "a", "aa", "b"]);

        names.clear();
        t.traverse_children(|n| names.push(n.name().to_owned()));
        assert_eq!(names, ["a", "aa", "b"]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_bounding_box_contains_children() {
        let t = tree();
        let b = t.bounding_box().unwrap();
        assert_eq!(b.min(), Point3::new(-2.0, -2.0, -2.0));
        assert_eq!(b.max(), Point3::new(4.0, 4.0, 4.0));
        t.traverse_children(|n| {
            assert!(b.contains(&n.bounding_box().unwrap()));
        });
        let a = &t.children()[0];
        assert!(a.bounding_box().unwrap().contains(
            &a.children()[0].bounding_box().unwrap()
        ));
    }

    #[test]
    fn test_empty_bounding_box() {
        let mut t = Node::new("root");
        assert!(t.bounding_box().is_none());
        t.add_child(Node::new("empty"));
        t.add_child(Node::with_content(Box::new(Dummy {
            name: "nothing",
            bbox: None,
        })));
        assert!(t.bounding_box().is_none());
    }

    #[test]
    fn test_render_order() {
        let mut t = tree();
        let mut gpu = RecordingGpu::default();
        let view = View::new(
            Default::default(),
            Default::default(),
            nalgebra::Vector2::new(0.1, 10.0),
            1.0,
        );
        t.render(&view, &mut gpu);
        // Name lengths: a, aa, b
        assert_eq!(gpu.calls, ["draw 1", "draw 2", "draw 1"]);
    }

    #[test]
    fn test_do_imgui_headless() {
        let mut t = tree();
        t.children_mut()[1].set_selected(true);
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| t.do_imgui(ui));
        });
        assert!(t.children()[1].is_selected());
        assert!(!t.is_selected());
    }
}
