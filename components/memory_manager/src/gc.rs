//! Tri-color mark-and-sweep collection over the managed object graph.
//!
//! Roots are pinned objects (local references, strong reference-table slots)
//! and the referents of strong global handles. Everything left white after
//! marking is swept. Weak global handles are not roots and are left in place
//! pointing at whatever identity they held.

use crate::heap::ManagedObject;
use core_types::ObjectRef;
use std::collections::HashMap;

/// Mark colors for tri-color marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MarkColor {
    /// Unmarked (not yet visited)
    #[default]
    White = 0,
    /// In process (reachable, needs scanning)
    Gray = 1,
    /// Fully processed (reachable, all references scanned)
    Black = 2,
}

/// Marks every object reachable from `roots`.
///
/// Roots naming objects that no longer exist are ignored. Returns the number
/// of objects blackened.
pub(crate) fn mark<I>(objects: &mut HashMap<ObjectRef, ManagedObject>, roots: I) -> usize
where
    I: IntoIterator<Item = ObjectRef>,
{
    let mut gray: Vec<ObjectRef> = Vec::new();

    for root in roots {
        if let Some(obj) = objects.get_mut(&root) {
            if obj.mark == MarkColor::White {
                obj.mark = MarkColor::Gray;
                gray.push(root);
            }
        }
    }

    let mut marked = 0;
    while let Some(current) = gray.pop() {
        let children = match objects.get_mut(&current) {
            Some(obj) => {
                obj.mark = MarkColor::Black;
                marked += 1;
                obj.references.clone()
            }
            None => continue,
        };

        for child in children {
            if let Some(obj) = objects.get_mut(&child) {
                if obj.mark == MarkColor::White {
                    obj.mark = MarkColor::Gray;
                    gray.push(child);
                }
            }
        }
    }

    marked
}

/// Removes every white object and resets survivors to white.
///
/// Returns the identities that were reclaimed.
pub(crate) fn sweep(objects: &mut HashMap<ObjectRef, ManagedObject>) -> Vec<ObjectRef> {
    let dead: Vec<ObjectRef> = objects
        .iter()
        .filter(|(_, obj)| obj.mark == MarkColor::White)
        .map(|(id, _)| *id)
        .collect();

    for id in &dead {
        objects.remove(id);
    }
    for obj in objects.values_mut() {
        obj.mark = MarkColor::White;
    }

    dead
}
