// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Client primitives for the aptly Debian repository manager.

This crate implements a typed client for the [aptly](https://www.aptly.info/)
REST API plus the local package primitives needed to manage repositories
with it.

# A Tour of Functionality

The [package_version] module implements Debian package version string
parsing, serialization, and comparison. [package_version::PackageVersion] is
the main type used for this; ordering agrees with the server so decisions
like rotation behave identically on both sides.

[package::Package] models the server's package identity, convertible to and
from aptly keys and direct references. [package::Package::from_file] derives
the identity (including the `FilesHash` fingerprint) a `.deb` on the local
filesystem will have once uploaded. The [deb] module extracts the control
paragraph from a `.deb` (see [deb::read_control_paragraph]) using the
[control] module's paragraph primitives.

The [client] module is the network layer. [client::Client] exposes typed
operations over the REST surface: upload directories, local repositories,
snapshots, packages, and publishes. Error responses surface as
[error::ApiError] with the server's structured error list attached.

Higher-level engines compose the client:

- [search::search] fans queries out across every repository and snapshot on
  a bounded worker pool, aggregating per-store failures instead of aborting.
- [publish::update_dependent_publishes] finds the publishes affected by a
  repository mutation and re-publishes (re-signs) each one.
- [rotate::rotate_packages] buckets packages by `(prefix, arch, name)` and
  selects old or new versions per bucket.

Both engines are written against small traits ([search::StoreSearch],
[publish::PublishOps]) so they can be driven by fakes in tests.

GPG signing parameters for publishes resolve through
[signing::SigningResolver]: a default [signing::SigningConfig] plus
per-publish overrides keyed on prefix and distribution.

[config::Config] carries the typed configuration (server URL, signing,
timeouts, worker bound) produced from layered profile files and
command-line overrides.

Long-running operations take a [cancel::CancelToken]; see [cancel::cancel_pair].
*/

pub mod cancel;
pub mod client;
pub mod config;
pub mod control;
pub mod deb;
pub mod error;
pub mod package;
pub mod package_version;
pub mod publish;
pub mod rotate;
pub mod search;
pub mod signing;
