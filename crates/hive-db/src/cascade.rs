//! Group cascade plan
//!
//! Deleting a group touches every table that can reference it. The order
//! below is the dependency order: leaf rows first, the group row last, so
//! an interrupted cascade never leaves a row pointing at a missing parent.

/// One delete of the group cascade, scoped by group id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    /// Items of every custom list owned by the group
    CustomListItems,
    /// Custom lists owned by the group
    CustomLists,
    /// Events assigned to the group
    Events,
    /// Shopping entries assigned to the group
    ShoppingEntries,
    /// Tasks assigned to the group
    Tasks,
    /// Access codes for the group
    AccessCodes,
    /// Activity log entries for the group
    ActivityLog,
    /// Membership rows of the group
    Memberships,
    /// The group row itself
    Group,
}

/// Fixed deletion order for a group and everything that references it
pub const GROUP_CASCADE_PLAN: [CascadeStep; 9] = [
    CascadeStep::CustomListItems,
    CascadeStep::CustomLists,
    CascadeStep::Events,
    CascadeStep::ShoppingEntries,
    CascadeStep::Tasks,
    CascadeStep::AccessCodes,
    CascadeStep::ActivityLog,
    CascadeStep::Memberships,
    CascadeStep::Group,
];

impl CascadeStep {
    /// Table the step deletes from
    pub const fn table(&self) -> &'static str {
        match self {
            Self::CustomListItems => "custom_list_items",
            Self::CustomLists => "custom_lists",
            Self::Events => "events",
            Self::ShoppingEntries => "shopping_entries",
            Self::Tasks => "tasks",
            Self::AccessCodes => "access_codes",
            Self::ActivityLog => "activity_log",
            Self::Memberships => "group_memberships",
            Self::Group => "groups",
        }
    }

    /// Row filter, with the group id bound as `$1`
    pub const fn predicate(&self) -> &'static str {
        match self {
            Self::CustomListItems => {
                "custom_list_id IN (SELECT id FROM custom_lists WHERE group_id = $1)"
            }
            Self::CustomLists | Self::AccessCodes | Self::ActivityLog | Self::Memberships => {
                "group_id = $1"
            }
            Self::Events | Self::ShoppingEntries | Self::Tasks => "assigned_to_id = $1",
            Self::Group => "id = $1",
        }
    }

    /// Whether membership rows must still exist when this step runs
    pub const fn needs_members_reset_first(&self) -> bool {
        matches!(self, Self::Memberships)
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {}", self.table(), self.predicate())
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {} WHERE {}", self.table(), self.predicate())
    }
}

impl std::fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}
