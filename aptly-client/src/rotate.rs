// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Version rotation policy.

Rotation buckets a heterogeneous package list by `(prefix, arch, name)` and
selects versions per bucket: with `n >= 0` the result is everything *except*
the newest `n` (the versions eligible for deletion); with `n < 0` it is the
newest `|n|` only. `|n|` larger than a bucket is clamped to the bucket size.
*/

use {
    crate::package::Package,
    std::{cmp::Ordering, collections::HashMap},
};

/// Group items and keep either the oldest or the newest of each group.
///
/// Items are grouped by `key_fn`, each group is sorted ascending by
/// `compare`, and the rotation rule above is applied per group. Ordering of
/// the concatenated result is unspecified.
pub fn rotate<T>(
    items: Vec<T>,
    key_fn: impl Fn(&T) -> String,
    compare: impl Fn(&T, &T) -> Ordering,
    n: i64,
) -> Vec<T> {
    let mut groups: HashMap<String, Vec<T>> = HashMap::new();
    for item in items {
        groups.entry(key_fn(&item)).or_default().push(item);
    }

    let mut out = vec![];
    for (_, mut group) in groups {
        group.sort_by(&compare);
        let count = group.len().min(n.unsigned_abs() as usize);

        if n >= 0 {
            group.truncate(group.len() - count);
            out.extend(group);
        } else {
            out.extend(group.split_off(group.len() - count));
        }
    }

    out
}

/// [rotate] instantiated for packages: bucket on `(prefix, arch, name)`,
/// order by Debian version.
pub fn rotate_packages(packages: Vec<Package>, n: i64) -> Vec<Package> {
    rotate(
        packages,
        |p| p.bucket_key(),
        |a, b| a.version.cmp(&b.version),
        n,
    )
}
