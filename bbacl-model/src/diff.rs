//! Operation diff engine
//!
//! Computes the plan that pushes a source permission set onto a target.

use std::collections::HashMap;

use crate::{Operation, PermissionGrant, PrincipalKind};

type GrantKey<'a> = (PrincipalKind, &'a str);

fn index(grants: &[PermissionGrant]) -> HashMap<GrantKey<'_>, &PermissionGrant> {
    grants
        .iter()
        .map(|g| ((g.kind, g.object_id.as_str()), g))
        .collect()
}

/// Compute the operations that make `target` match `source`.
///
/// Grants are keyed by `(kind, object_id)`, so a user and a group with the
/// same id never collide. Unchanged grants appear as no-op entries. The
/// result is sorted by kind then object id.
pub fn diff(source: &[PermissionGrant], target: &[PermissionGrant]) -> Vec<Operation> {
    let source_index = index(source);
    let target_index = index(target);

    let mut operations: Vec<Operation> = source_index
        .iter()
        .map(|(key, src)| match target_index.get(key) {
            Some(dst) if dst.level == src.level => Operation::same(src),
            Some(dst) => {
                // Name and id come from the source; "before" is what the
                // target has today.
                let current = PermissionGrant {
                    level: dst.level,
                    ..(*src).clone()
                };
                Operation::update(&current, src.level)
            }
            None => Operation::add(src),
        })
        .collect();

    operations.extend(
        target_index
            .iter()
            .filter(|(key, _)| !source_index.contains_key(*key))
            .map(|(_, dst)| Operation::remove(dst)),
    );

    operations.sort_by(|a, b| {
        a.kind()
            .as_str()
            .cmp(b.kind().as_str())
            .then_with(|| a.object_id().cmp(b.object_id()))
    });
    operations
}

/// Drop no-op entries, keeping the order
pub fn actionable(operations: Vec<Operation>) -> Vec<Operation> {
    operations.into_iter().filter(|op| !op.is_noop()).collect()
}

/// One remove operation per grant
pub fn remove_all(grants: &[PermissionGrant]) -> Vec<Operation> {
    grants.iter().map(Operation::remove).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, PermissionLevel::*};

    fn messages(ops: &[Operation]) -> Vec<String> {
        ops.iter().map(Operation::message).collect()
    }

    #[test]
    fn test_reconciliation_plan_messages() {
        let source = vec![
            PermissionGrant::user("{abc}", "same", Read),
            PermissionGrant::user("{abcd-1234-5678-90ef}", "update", Write),
            PermissionGrant::group("developer", "diff-grp", Read),
            PermissionGrant::user("{xyz}", "add", Write),
        ];
        let target = vec![
            PermissionGrant::user("{abcd-1234-5678-90ef}", "update", Read),
            PermissionGrant::user("{abc}", "same", Read),
            PermissionGrant::user("{lmn}", "remove", Admin),
            PermissionGrant::group("developer", "diff-grp", Admin),
        ];

        let ops = diff(&source, &target);

        assert_eq!(
            messages(&ops),
            vec![
                "Update: group diff-grp ADMIN => READ",
                "Update: user update READ => WRITE",
                "Same: user same (READ)",
                "Remove: user remove (ADMIN)",
                "Add: user add (WRITE)",
            ]
        );

        assert_eq!(ops[0].object_id(), "developer");
        assert_eq!(ops[0].level_before(), Some(Admin));
        assert_eq!(ops[0].level_after(), Some(Read));
        assert_eq!(ops[3].level_after(), None);
        assert_eq!(ops[4].level_before(), None);
    }

    #[test]
    fn test_equal_sets_yield_only_noops() {
        let set = vec![
            PermissionGrant::group("admins", "Admins", Admin),
            PermissionGrant::user("{1}", "one", Write),
            PermissionGrant::user("{2}", "two", Read),
        ];

        let ops = diff(&set, &set);

        assert_eq!(ops.len(), set.len());
        assert!(ops.iter().all(Operation::is_noop));
        assert!(actionable(ops).is_empty());
    }

    #[test]
    fn test_disjoint_sets() {
        let source = vec![
            PermissionGrant::user("{a}", "a", Read),
            PermissionGrant::group("g1", "g1", Write),
        ];
        let target = vec![PermissionGrant::user("{b}", "b", Admin)];

        let ops = diff(&source, &target);
        let actions: Vec<_> = ops.iter().map(|o| (o.object_id(), o.action())).collect();

        assert_eq!(
            actions,
            vec![
                ("g1", Action::Add),
                ("{a}", Action::Add),
                ("{b}", Action::Remove),
            ]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let grants = vec![PermissionGrant::user("{a}", "a", Read)];

        assert!(diff(&[], &[]).is_empty());
        assert!(diff(&grants, &[])
            .iter()
            .all(|o| o.action() == Action::Add));
        assert!(diff(&[], &grants)
            .iter()
            .all(|o| o.action() == Action::Remove));
    }

    #[test]
    fn test_user_and_group_with_same_id_do_not_collide() {
        let source = vec![PermissionGrant::group("ops", "ops-group", Write)];
        let target = vec![PermissionGrant::user("ops", "ops-user", Write)];

        let ops = diff(&source, &target);

        assert_eq!(messages(&ops), vec!["Add: group ops-group (WRITE)", "Remove: user ops-user (WRITE)"]);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let mut source: Vec<_> = (0..20)
            .map(|i| PermissionGrant::user(format!("{{{i:02}}}"), format!("u{i}"), Write))
            .collect();
        source.push(PermissionGrant::group("zeta", "zeta", Read));
        let target: Vec<_> = source.iter().rev().take(7).cloned().collect();

        let first = diff(&source, &target);
        for _ in 0..10 {
            assert_eq!(diff(&source, &target), first);
        }
        assert_eq!(first[0].kind(), PrincipalKind::Group);
        assert!(first[1..]
            .windows(2)
            .all(|w| w[0].object_id() < w[1].object_id()));
    }

    #[test]
    fn test_remove_all() {
        let grants = vec![
            PermissionGrant::user("{a}", "a", Read),
            PermissionGrant::group("g", "g", Admin),
        ];
        let ops = remove_all(&grants);
        assert_eq!(messages(&ops), vec!["Remove: user a (READ)", "Remove: group g (ADMIN)"]);
    }
}
