//! Mode definitions and the mode registry.

use std::collections::HashMap;

/// A single-character trigger bound to a host command identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybind {
    /// Trigger character (never an ASCII digit).
    pub key: char,
    /// Host command identifier, non-empty and trimmed.
    pub command: String,
}

/// A validated mode definition, produced only by [`crate::config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDefinition {
    /// Mode name, trimmed, 1-16 lowercase letters and spaces.
    pub name: String,
    /// Optional kebab-case icon identifier.
    pub icon: Option<String>,
    /// Whether this mode intercepts every keystroke.
    pub capturing: bool,
    /// Whether the session starts in this mode.
    pub starting_mode: bool,
    /// Keybindings, only present for capturing modes.
    pub keybindings: Vec<Keybind>,
}

/// Stable identifier of a registered mode (its slot in the registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeId(usize);

impl ModeId {
    /// Slot index of this mode in registry order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ModeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered mode. Owned by the [`ModeRegistry`]; everything else refers
/// to modes by [`ModeId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    id: ModeId,
    name: String,
    icon: Option<String>,
    capturing: bool,
    bindings: HashMap<char, String>,
}

impl Mode {
    /// Identifier of this mode.
    #[must_use]
    pub const fn id(&self) -> ModeId {
        self.id
    }

    /// Mode name as configured.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Icon identifier, if one was configured.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Whether this mode intercepts every keystroke.
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Command bound to `key` in this mode, if any.
    #[must_use]
    pub fn command_for(&self, key: char) -> Option<&str> {
        self.bindings.get(&key).map(String::as_str)
    }

    /// Status bar text for this mode, e.g. `-- $(edit) NORMAL --`.
    #[must_use]
    pub fn display_text(&self) -> String {
        let name = self.name.to_uppercase();
        self.icon.as_ref().map_or_else(
            || format!("-- {name} --"),
            |icon| format!("-- $({icon}) {name} --"),
        )
    }
}

/// All registered modes plus the resolved starting mode.
///
/// Ids are assigned in definition order, so command naming and tests are
/// deterministic for a given configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRegistry {
    modes: Vec<Mode>,
    starting: ModeId,
}

impl ModeRegistry {
    /// Build the registry from validated definitions.
    ///
    /// The starting mode is the first definition flagged `starting_mode`,
    /// or the first definition when none is flagged. Duplicate names and
    /// duplicate keys were already rejected by validation.
    #[must_use]
    pub fn build(defs: Vec<ModeDefinition>) -> Self {
        let starting = defs
            .iter()
            .position(|def| def.starting_mode)
            .unwrap_or_default();

        let modes = defs
            .into_iter()
            .enumerate()
            .map(|(index, def)| {
                let bindings = def
                    .keybindings
                    .into_iter()
                    .map(|bind| (bind.key, bind.command))
                    .collect();
                Mode {
                    id: ModeId(index),
                    name: def.name,
                    icon: def.icon,
                    capturing: def.capturing,
                    bindings,
                }
            })
            .collect();

        Self {
            modes,
            starting: ModeId(starting),
        }
    }

    /// Id of the mode the session starts in.
    #[must_use]
    pub const fn starting_mode(&self) -> ModeId {
        self.starting
    }

    /// Mode registered under `id`.
    ///
    /// Ids are only handed out by this registry, so every id resolves.
    #[must_use]
    pub fn get(&self, id: ModeId) -> &Mode {
        &self.modes[id.0]
    }

    /// Id of the mode after `id`, wrapping back to the first.
    #[must_use]
    pub const fn next(&self, id: ModeId) -> ModeId {
        ModeId((id.0 + 1) % self.modes.len())
    }

    /// Id of the mode named `name` (exact match).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ModeId> {
        self.modes
            .iter()
            .position(|mode| mode.name == name)
            .map(ModeId)
    }

    /// Modes in id order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Mode> {
        self.modes.iter()
    }

    /// Number of registered modes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.modes.len()
    }

    /// Whether the registry holds no modes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ModeRegistry {
    type Item = &'a Mode;
    type IntoIter = std::slice::Iter<'a, Mode>;

    fn into_iter(self) -> Self::IntoIter {
        self.modes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn def(name: &str, capturing: bool, starting: bool) -> ModeDefinition {
        ModeDefinition {
            name: name.to_string(),
            icon: None,
            capturing,
            starting_mode: starting,
            keybindings: Vec::new(),
        }
    }

    #[test]
    fn test_build_preserves_definition_order() {
        let registry = ModeRegistry::build(vec![
            def("normal", true, false),
            def("insert", false, false),
            def("select", true, false),
        ]);

        let names: Vec<_> = registry.iter().map(Mode::name).collect();
        assert_eq!(names, vec!["normal", "insert", "select"]);
        for (index, mode) in registry.iter().enumerate() {
            assert_eq!(mode.id().index(), index);
        }
    }

    #[test]
    fn test_starting_mode_defaults_to_first() {
        let registry = ModeRegistry::build(vec![
            def("normal", true, false),
            def("insert", false, false),
        ]);
        assert_eq!(registry.starting_mode().index(), 0);
    }

    #[test]
    fn test_starting_mode_first_flagged_wins() {
        let registry = ModeRegistry::build(vec![
            def("normal", true, false),
            def("insert", false, true),
            def("select", true, true),
        ]);
        assert_eq!(registry.starting_mode().index(), 1);
    }

    #[test]
    fn test_find_is_exact_match() {
        let registry = ModeRegistry::build(vec![
            def("normal", true, false),
            def("insert", false, false),
        ]);

        assert_eq!(registry.find("insert").map(ModeId::index), Some(1));
        assert_eq!(registry.find("Insert"), None);
        assert_eq!(registry.find("inser"), None);
    }

    #[test]
    fn test_next_wraps_around() {
        let registry = ModeRegistry::build(vec![
            def("normal", true, false),
            def("insert", false, false),
        ]);

        let second = registry.next(registry.starting_mode());
        assert_eq!(second.index(), 1);
        assert_eq!(registry.next(second).index(), 0);
    }

    #[test]
    fn test_display_text_without_icon() {
        let registry = ModeRegistry::build(vec![def("normal", true, false)]);
        let mode = registry.get(registry.starting_mode());
        assert_eq!(mode.display_text(), "-- NORMAL --");
    }

    #[test]
    fn test_display_text_with_icon() {
        let mut definition = def("insert", false, false);
        definition.icon = Some("edit".to_string());
        let registry = ModeRegistry::build(vec![definition]);
        let mode = registry.get(registry.starting_mode());
        assert_eq!(mode.display_text(), "-- $(edit) INSERT --");
        assert_eq!(mode.icon(), Some("edit"));
    }

    #[test]
    fn test_binding_table_lookup() {
        let definition = ModeDefinition {
            name: "normal".to_string(),
            icon: None,
            capturing: true,
            starting_mode: false,
            keybindings: vec![
                Keybind {
                    key: 'i',
                    command: "editor.enterInsert".to_string(),
                },
                Keybind {
                    key: 'x',
                    command: "editor.deleteRight".to_string(),
                },
            ],
        };
        let registry = ModeRegistry::build(vec![definition]);
        let mode = registry.get(registry.starting_mode());

        assert_eq!(mode.command_for('i'), Some("editor.enterInsert"));
        assert_eq!(mode.command_for('x'), Some("editor.deleteRight"));
        assert_eq!(mode.command_for('q'), None);
    }
}
