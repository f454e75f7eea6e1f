//! Menu-like tree of command categories
use enum_map::{Enum, EnumMap};
use strum::IntoEnumIterator;

/// Identifier for a command group
///
/// The tree shape is fixed: see [`GroupId::parent`].
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Enum, strum::EnumIter,
)]
pub enum GroupId {
    /// Root of the tree (not shown in menus)
    Root,
    /// `File`
    File,
    /// `File ▸ Load`
    FileLoad,
    /// `File ▸ Save`
    FileSave,
    /// `Scene`
    Scene,
    /// `Scene ▸ Mesh`
    SceneMesh,
    /// `Debug`
    Debug,
}

impl GroupId {
    /// Returns the parent group, or `None` for [`GroupId::Root`]
    pub fn parent(self) -> Option<GroupId> {
        match self {
            GroupId::Root => None,
            GroupId::File | GroupId::Scene | GroupId::Debug => {
                Some(GroupId::Root)
            }
            GroupId::FileLoad | GroupId::FileSave => Some(GroupId::File),
            GroupId::SceneMesh => Some(GroupId::Scene),
        }
    }

    /// Returns the name shown in menus
    pub fn display_name(self) -> &'static str {
        match self {
            GroupId::Root => "",
            GroupId::File => "File",
            GroupId::FileLoad => "Load",
            GroupId::FileSave => "Save",
            GroupId::Scene => "Scene",
            GroupId::SceneMesh => "Mesh",
            GroupId::Debug => "Debug",
        }
    }
}

/// A single category in the group tree
#[derive(Clone, Debug)]
pub struct Group {
    id: GroupId,
    children: Vec<GroupId>,
    commands: Vec<String>,
}

impl Group {
    /// Returns this group's id
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns this group's display name
    pub fn name(&self) -> &'static str {
        self.id.display_name()
    }

    /// Returns child groups, in declaration order
    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    /// Returns names of commands registered in this group, in registration
    /// order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Adds a command name to this group
    pub fn add_command(&mut self, name: &str) {
        self.commands.push(name.to_owned());
    }
}

/// The complete group tree
///
/// The tree is built in full when this object is constructed; afterwards,
/// only the command lists change.
#[derive(Clone, Debug)]
pub struct Groups {
    groups: EnumMap<GroupId, Group>,
}

impl Default for Groups {
    fn default() -> Self {
        Self::new()
    }
}

impl Groups {
    /// Builds the group tree
    pub fn new() -> Self {
        let mut groups = EnumMap::from_fn(|id| Group {
            id,
            children: vec![],
            commands: vec![],
        });
        for id in GroupId::iter() {
            if let Some(p) = id.parent() {
                groups[p].children.push(id);
            }
        }
        Self { groups }
    }

    /// Returns the root of the tree
    pub fn root(&self) -> &Group {
        &self.groups[GroupId::Root]
    }

    /// Looks up a group by id
    pub fn get(&self, id: GroupId) -> &Group {
        &self.groups[id]
    }

    /// Looks up a group by id, mutably
    pub fn get_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id]
    }

    /// Visits every group in depth-first pre-order, with its depth
    pub fn walk<F: FnMut(&Group, usize)>(&self, mut f: F) {
        self.walk_from(GroupId::Root, 0, &mut f)
    }

    fn walk_from<F: FnMut(&Group, usize)>(
        &self,
        id: GroupId,
        depth: usize,
        f: &mut F,
    ) {
        let g = self.get(id);
        f(g, depth);
        for c in g.children() {
            self.walk_from(*c, depth + 1, f);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tree_shape() {
        let g = Groups::new();
        assert_eq!(
            g.root().children(),
            [GroupId::File, GroupId::Scene, GroupId::Debug]
        );
        assert_eq!(
            g.get(GroupId::File).children(),
            [GroupId::FileLoad, GroupId::FileSave]
        );
        assert_eq!(g.get(GroupId::SceneMesh).name(), "Mesh");
        assert!(g.get(GroupId::SceneMesh).children().is_empty());
    }

    #[test]
    fn test_walk_order() {
        let g = Groups::new();
        let mut seen = vec![];
        g.walk(|g, depth| seen.push((g.id(), depth)));
        assert_eq!(
            seen,
            [
                (GroupId::Root, 0),
                (GroupId::File, 1),
                (GroupId::FileLoad, 2),
                (GroupId::FileSave, 2),
                (GroupId::Scene, 1),
                (GroupId::SceneMesh, 2),
                (GroupId::Debug, 1),
            ]
        );
    }

    #[test]
    fn test_commands_accumulate() {
        let mut g = Groups::new();
        g.get_mut(GroupId::Debug).add_command("noop");
        g.get_mut(GroupId::Debug).add_command("barrier");
        assert_eq!(g.get(GroupId::Debug).commands(), ["noop", "barrier"]);
    }
}
