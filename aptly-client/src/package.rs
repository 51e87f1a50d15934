// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package identity.

aptly identifies a package by its *key*, `"{prefix}P{arch} {name} {version}
{files_hash}"`, where `files_hash` fingerprints the exact bytes in the pool.
The human-friendly *direct reference* `"{name}_{version}_{arch}"` omits the
hash and is therefore ambiguous; it is resolved by searching a named repo.

[Package::from_file] derives the same identity the server would assign to a
`.deb` uploaded from disk, which lets callers predict keys before an upload
happens.
*/

use {
    crate::{
        deb,
        error::{AptlyError, Result},
        package_version::PackageVersion,
    },
    md5::Md5,
    once_cell::sync::Lazy,
    regex::Regex,
    sha1::Sha1,
    sha2::{Digest, Sha256, Sha512},
    std::{
        cmp::Ordering,
        collections::HashMap,
        fmt::{Display, Formatter},
        hash::{Hash, Hasher},
        io::Read,
        path::Path,
    },
};

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w*?)P(\w+) (\S+) (\S+) (\w+)$").expect("known good regex"));

static DIR_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+?)_(\S+?)_(\w+)$").expect("known good regex"));

const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// 64-bit FNV-1a over a byte string.
fn fnv1a_64(data: &[u8]) -> u64 {
    data.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x100_0000_01b3)
    })
}

/// Checksums and location of a package file on the local filesystem.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageFileInfo {
    /// File name after symlink resolution.
    pub filename: String,
    /// Canonicalized absolute path.
    pub path: String,
    /// The path as supplied by the caller.
    pub orig_path: String,
    pub size: u64,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

impl PackageFileInfo {
    /// The FNV-1a fingerprint aptly derives for an uploaded file.
    ///
    /// The input is the exact byte concatenation the server uses: ASCII
    /// filename, 8-byte big-endian size, then the md5, sha1 and sha256 hex
    /// digests. Rendered as lowercase hex without leading zeros.
    pub fn files_hash(&self) -> String {
        let mut data = Vec::with_capacity(
            self.filename.len() + 8 + self.md5.len() + self.sha1.len() + self.sha256.len(),
        );
        data.extend_from_slice(self.filename.as_bytes());
        data.extend_from_slice(&self.size.to_be_bytes());
        data.extend_from_slice(self.md5.as_bytes());
        data.extend_from_slice(self.sha1.as_bytes());
        data.extend_from_slice(self.sha256.as_bytes());

        format!("{:x}", fnv1a_64(&data))
    }
}

/// A package in aptly or on the local filesystem.
#[derive(Clone, Debug)]
pub struct Package {
    pub name: String,
    pub version: PackageVersion,
    pub arch: String,
    pub prefix: String,
    pub files_hash: String,
    /// Full field map, when obtained from a details response or a local file.
    pub fields: Option<HashMap<String, String>>,
    /// Local file info, when derived from a file on disk.
    pub file: Option<PackageFileInfo>,
}

impl Package {
    /// The aptly key of this package.
    pub fn key(&self) -> String {
        format!(
            "{}P{} {} {} {}",
            self.prefix, self.arch, self.name, self.version, self.files_hash
        )
    }

    /// The key without its files-hash.
    pub fn short_key(&self) -> String {
        format!("{}P{} {} {}", self.prefix, self.arch, self.name, self.version)
    }

    /// The direct reference of this package.
    pub fn dir_ref(&self) -> String {
        format!("{}_{}_{}", self.name, self.version, self.arch)
    }

    /// Construct an instance by parsing an aptly key.
    pub fn from_key(key: &str) -> Result<Self> {
        let caps = KEY_RE
            .captures(key)
            .ok_or_else(|| AptlyError::InvalidKey(key.to_string()))?;

        Ok(Self {
            prefix: caps[1].to_string(),
            arch: caps[2].to_string(),
            name: caps[3].to_string(),
            version: PackageVersion::parse(&caps[4])?,
            files_hash: caps[5].to_string(),
            fields: None,
            file: None,
        })
    }

    /// Construct an instance from a details-format API response element.
    pub fn from_api_response(fields: HashMap<String, String>) -> Result<Self> {
        let key = fields
            .get("Key")
            .ok_or_else(|| AptlyError::InvalidKey("response without Key field".to_string()))?;

        let mut package = Self::from_key(key)?;
        package.fields = Some(fields);

        Ok(package)
    }

    /// Build the representation of an aptly package from a `.deb` on the
    /// local filesystem.
    ///
    /// The file is streamed once in 1 MiB chunks to compute all content
    /// digests, then the control paragraph is read to obtain name, version
    /// and architecture. The resulting field map carries the extra fields
    /// the server would report for the package (`Key`, `FilesHash`,
    /// checksums, `Size`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let orig_path = path.as_ref();
        let canonical = std::fs::canonicalize(orig_path)
            .map_err(|e| AptlyError::IoPath(orig_path.display().to_string(), e))?;
        let filename = canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AptlyError::IoPath(
                    orig_path.display().to_string(),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
                )
            })?;

        let mut file = std::fs::File::open(&canonical)
            .map_err(|e| AptlyError::IoPath(canonical.display().to_string(), e))?;

        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut sha512 = Sha512::new();
        let mut size = 0u64;
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let count = file
                .read(&mut buffer)
                .map_err(|e| AptlyError::IoPath(canonical.display().to_string(), e))?;
            if count == 0 {
                break;
            }

            size += count as u64;
            md5.update(&buffer[0..count]);
            sha1.update(&buffer[0..count]);
            sha256.update(&buffer[0..count]);
            sha512.update(&buffer[0..count]);
        }

        let file_info = PackageFileInfo {
            filename,
            path: canonical.display().to_string(),
            orig_path: orig_path.display().to_string(),
            size,
            md5: hex::encode(md5.finalize()),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
            sha512: hex::encode(sha512.finalize()),
        };
        let files_hash = file_info.files_hash();

        let paragraph = deb::read_control_paragraph(orig_path)?;
        let name = paragraph.required_field_str("Package")?.to_string();
        let version = PackageVersion::parse(paragraph.required_field_str("Version")?)?;
        let arch = paragraph.required_field_str("Architecture")?.to_string();

        let mut fields = paragraph.into_map();
        fields.insert("Filename".to_string(), file_info.filename.clone());
        fields.insert("FilesHash".to_string(), files_hash.clone());
        fields.insert(
            "Key".to_string(),
            format!("P{} {} {} {}", arch, name, version, files_hash),
        );
        fields.insert(
            "ShortKey".to_string(),
            format!("P{} {} {}", arch, name, version),
        );
        fields.insert("MD5sum".to_string(), file_info.md5.clone());
        fields.insert("SHA1".to_string(), file_info.sha1.clone());
        fields.insert("SHA256".to_string(), file_info.sha256.clone());
        fields.insert("SHA512".to_string(), file_info.sha512.clone());
        fields.insert("Size".to_string(), size.to_string());

        Ok(Self {
            name,
            version,
            arch,
            prefix: String::new(),
            files_hash,
            fields: Some(fields),
            file: Some(file_info),
        })
    }

    /// The `"{prefix}{arch}{name}"` bucket key used by rotation.
    pub fn bucket_key(&self) -> String {
        format!("{}{}{}", self.prefix, self.arch, self.name)
    }
}

impl Display for Package {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.arch == other.arch
            && self.name == other.name
            && self.version == other.version
            && self.files_hash == other.files_hash
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.arch.hash(state);
        self.name.hash(state);
        self.version.hash(state);
        self.files_hash.hash(state);
    }
}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.arch.cmp(&other.arch))
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.files_hash.cmp(&other.files_hash))
    }
}

/// A direct package reference: `"{name}_{version}_{arch}"`.
///
/// Ambiguous by design (no files-hash); resolved to a full key by searching
/// a repo for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectRef {
    pub name: String,
    pub version: PackageVersion,
    pub arch: String,
}

impl DirectRef {
    /// Construct an instance by parsing a direct reference string.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = DIR_REF_RE
            .captures(s)
            .ok_or_else(|| AptlyError::InvalidDirectRef(s.to_string()))?;

        Ok(Self {
            name: caps[1].to_string(),
            version: PackageVersion::parse(&caps[2])
                .map_err(|_| AptlyError::InvalidDirectRef(s.to_string()))?,
            arch: caps[3].to_string(),
        })
    }
}

impl Display for DirectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.name, self.version, self.arch)
    }
}

#[cfg(test)]
mod test {
    use {super::*, crate::deb::test_support::build_deb, indoc::indoc};

    #[test]
    fn fnv1a_64_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn key_round_trip() -> Result<()> {
        for key in [
            "Pamd64 rustc 1.48.0+dfsg1-2 87415bdc9ef60793",
            "Psource rustc 1.48.0+dfsg1-2 1874ac1ecae98276",
            "xenialPi386 aptly 1.2.0-1 f2b5bf57981bb3d9",
        ] {
            let package = Package::from_key(key)?;
            assert_eq!(package.key(), key);
        }

        Ok(())
    }

    #[test]
    fn key_components() -> Result<()> {
        let package = Package::from_key("xenialPi386 aptly 1.2.0-1 f2b5bf57981bb3d9")?;
        assert_eq!(package.prefix, "xenial");
        assert_eq!(package.arch, "i386");
        assert_eq!(package.name, "aptly");
        assert_eq!(package.version.to_string(), "1.2.0-1");
        assert_eq!(package.files_hash, "f2b5bf57981bb3d9");
        assert_eq!(package.short_key(), "xenialPi386 aptly 1.2.0-1");
        assert_eq!(package.dir_ref(), "aptly_1.2.0-1_i386");
        assert_eq!(package.bucket_key(), "xeniali386aptly");

        Ok(())
    }

    #[test]
    fn invalid_keys_rejected() {
        for key in [
            "",
            "Pamd64 aptly 1.2.0-1",
            "Pamd64 aptly 1.2.0-1 hash extra",
            "amd64 aptly 1.2.0-1 f2b5bf57981bb3d9",
        ] {
            assert!(matches!(
                Package::from_key(key),
                Err(AptlyError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn direct_ref_parse() -> Result<()> {
        let direct = DirectRef::parse("aptly_1.3.0+ds1-2_amd64")?;
        assert_eq!(direct.name, "aptly");
        assert_eq!(direct.version.to_string(), "1.3.0+ds1-2");
        assert_eq!(direct.arch, "amd64");
        assert_eq!(direct.to_string(), "aptly_1.3.0+ds1-2_amd64");

        assert!(DirectRef::parse("nounderscores").is_err());

        Ok(())
    }

    #[test]
    fn from_api_response_attaches_fields() -> Result<()> {
        let fields = HashMap::from([
            (
                "Key".to_string(),
                "Pamd64 rustc 1.48.0+dfsg1-2 87415bdc9ef60793".to_string(),
            ),
            ("Section".to_string(), "rust".to_string()),
        ]);

        let package = Package::from_api_response(fields)?;
        assert_eq!(package.name, "rustc");
        assert_eq!(
            package.fields.as_ref().unwrap().get("Section"),
            Some(&"rust".to_string())
        );

        Ok(())
    }

    const CONTROL: &str = indoc! {"
        Package: aptly
        Version: 1.3.0+ds1-2
        Architecture: amd64
        Maintainer: nobody <nobody@example.org>
        Description: Debian repository management tool
    "};

    #[test]
    fn from_file_identity() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let deb_path = dir.path().join("aptly_1.3.0+ds1-2_amd64.deb");
        let deb_bytes = build_deb(CONTROL);
        std::fs::write(&deb_path, &deb_bytes)?;

        let package = Package::from_file(&deb_path)?;
        assert_eq!(package.name, "aptly");
        assert_eq!(package.version.to_string(), "1.3.0+ds1-2");
        assert_eq!(package.arch, "amd64");
        assert_eq!(package.prefix, "");
        assert_eq!(package.dir_ref(), "aptly_1.3.0+ds1-2_amd64");

        let info = package.file.as_ref().unwrap();
        assert_eq!(info.size, deb_bytes.len() as u64);
        assert_eq!(info.filename, "aptly_1.3.0+ds1-2_amd64.deb");
        assert_eq!(info.md5, hex::encode(Md5::digest(&deb_bytes)));
        assert_eq!(info.sha256, hex::encode(Sha256::digest(&deb_bytes)));

        let fields = package.fields.as_ref().unwrap();
        assert_eq!(fields.get("Size"), Some(&deb_bytes.len().to_string()));
        assert_eq!(fields.get("FilesHash"), Some(&package.files_hash));
        assert_eq!(
            fields.get("Key"),
            Some(&format!("Pamd64 aptly 1.3.0+ds1-2 {}", package.files_hash))
        );
        assert_eq!(fields.get("ShortKey"), Some(&"Pamd64 aptly 1.3.0+ds1-2".to_string()));

        Ok(())
    }

    #[test]
    fn files_hash_depends_on_name_and_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let deb_bytes = build_deb(CONTROL);

        let path_a = dir.path().join("aptly_1.3.0+ds1-2_amd64.deb");
        std::fs::write(&path_a, &deb_bytes)?;

        // Same bytes, same name: stable hash.
        let first = Package::from_file(&path_a)?;
        let second = Package::from_file(&path_a)?;
        assert_eq!(first.files_hash, second.files_hash);
        assert_eq!(first, second);

        // Same bytes, different name: different hash.
        let path_b = dir.path().join("renamed.deb");
        std::fs::write(&path_b, &deb_bytes)?;
        let renamed = Package::from_file(&path_b)?;
        assert_ne!(first.files_hash, renamed.files_hash);

        // Different bytes, same name: different hash.
        let other_bytes = build_deb(&CONTROL.replace("nobody", "somebody"));
        let other_dir = dir.path().join("other");
        std::fs::create_dir_all(&other_dir)?;
        let path_c = other_dir.join("aptly_1.3.0+ds1-2_amd64.deb");
        std::fs::write(&path_c, &other_bytes)?;
        let changed = Package::from_file(&path_c)?;
        assert_ne!(first.files_hash, changed.files_hash);
        assert_ne!(
            first.file.as_ref().unwrap().sha256,
            changed.file.as_ref().unwrap().sha256
        );

        Ok(())
    }
}
