//! Write planning: turn an aggregate's tracked changes into ordered table writes.
//!
//! Plans are pure data. Backends execute them front to back inside one
//! transaction, so the order below is also the FK order:
//!
//! ```text
//! upsert root
//! insert child -> insert link      (per added child)
//! update child                     (per updated child)
//! delete link  -> delete child     (per removed child)
//! ```

use chrono::{DateTime, Utc};

use fintrack_core::{AggregateRoot, Entity};

use super::mapper::{AggregateMapper, TableSpec};
use super::row::{Row, format_timestamp};
use super::r#trait::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    UpsertRoot {
        table: &'static str,
        row: Row,
    },
    InsertChild {
        table: &'static str,
        row: Row,
    },
    /// Link a child to its root. `user_id` must be the root row's owner.
    InsertLink {
        table: &'static str,
        root_table: &'static str,
        root_id: String,
        child_id: String,
        user_id: String,
    },
    UpdateChild {
        table: &'static str,
        row: Row,
    },
    DeleteLink {
        table: &'static str,
        root_id: String,
        child_id: String,
    },
    DeleteChild {
        table: &'static str,
        id: String,
    },
    /// Delete every link row of `root_id` and the child rows they point at.
    DeleteLinkedChildren {
        link_table: &'static str,
        child_table: &'static str,
        root_id: String,
    },
    DeleteRoot {
        table: &'static str,
        id: String,
    },
    SoftDeleteRoot {
        table: &'static str,
        id: String,
        deleted_at: String,
    },
}

impl WriteOp {
    pub fn kind(&self) -> WriteKind {
        match self {
            WriteOp::UpsertRoot { .. } => WriteKind::UpsertRoot,
            WriteOp::InsertChild { .. } => WriteKind::InsertChild,
            WriteOp::InsertLink { .. } => WriteKind::InsertLink,
            WriteOp::UpdateChild { .. } => WriteKind::UpdateChild,
            WriteOp::DeleteLink { .. } => WriteKind::DeleteLink,
            WriteOp::DeleteChild { .. } => WriteKind::DeleteChild,
            WriteOp::DeleteLinkedChildren { .. } => WriteKind::DeleteLinkedChildren,
            WriteOp::DeleteRoot { .. } => WriteKind::DeleteRoot,
            WriteOp::SoftDeleteRoot { .. } => WriteKind::SoftDeleteRoot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    UpsertRoot,
    InsertChild,
    InsertLink,
    UpdateChild,
    DeleteLink,
    DeleteChild,
    DeleteLinkedChildren,
    DeleteRoot,
    SoftDeleteRoot,
}

/// Ordered list of writes for one repository call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePlan {
    ops: Vec<WriteOp>,
}

impl WritePlan {
    /// Plan for `save`: root upsert plus the net child delta.
    pub fn for_save<M: AggregateMapper>(
        mapper: &M,
        aggregate: &M::Aggregate,
    ) -> Result<Self, RepositoryError> {
        let spec = mapper.spec();
        let root_row = mapper.root_to_row(aggregate.root());
        let root_id = root_row.id()?.to_owned();
        let user_id = aggregate.user_id().to_string();
        let changes = aggregate.children().pending_changes();

        let mut ops = Vec::with_capacity(
            1 + 2 * (changes.inserts.len() + changes.deletes.len()) + changes.updates.len(),
        );
        ops.push(WriteOp::UpsertRoot {
            table: spec.root_table,
            row: root_row,
        });

        for child in changes.inserts {
            let row = mapper.child_to_row(child);
            let child_id = row.id()?.to_owned();
            ops.push(WriteOp::InsertChild {
                table: spec.child_table,
                row,
            });
            ops.push(WriteOp::InsertLink {
                table: spec.link_table,
                root_table: spec.root_table,
                root_id: root_id.clone(),
                child_id,
                user_id: user_id.clone(),
            });
        }

        for child in changes.updates {
            ops.push(WriteOp::UpdateChild {
                table: spec.child_table,
                row: mapper.child_to_row(child),
            });
        }

        for child in changes.deletes {
            let child_id = child.id().to_string();
            ops.push(WriteOp::DeleteLink {
                table: spec.link_table,
                root_id: root_id.clone(),
                child_id: child_id.clone(),
            });
            ops.push(WriteOp::DeleteChild {
                table: spec.child_table,
                id: child_id,
            });
        }

        Ok(Self { ops })
    }

    /// Plan for a hard `delete`: links, linked children, then the root.
    pub fn for_delete(spec: &TableSpec, root_id: String) -> Self {
        Self {
            ops: vec![
                WriteOp::DeleteLinkedChildren {
                    link_table: spec.link_table,
                    child_table: spec.child_table,
                    root_id: root_id.clone(),
                },
                WriteOp::DeleteRoot {
                    table: spec.root_table,
                    id: root_id,
                },
            ],
        }
    }

    pub fn for_soft_delete(spec: &TableSpec, root_id: String, at: DateTime<Utc>) -> Self {
        Self {
            ops: vec![WriteOp::SoftDeleteRoot {
                table: spec.root_table,
                id: root_id,
                deleted_at: format_timestamp(at),
            }],
        }
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn count(&self, kind: WriteKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }
}

impl FromIterator<WriteOp> for WritePlan {
    fn from_iter<I: IntoIterator<Item = WriteOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
