//! Dex Scanner
//!
//! Reads class definitions out of compiled dex files to find the plugin
//! entry point, without going through a decompiler.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::entrypoint::{
    descriptor_to_class_name, EntryPointCandidate, EntryPointDiscovery, PLUGIN_ANNOTATION,
    RESERVED_METHOD, RESERVED_METHOD_DESCRIPTOR,
};
use crate::BuildError;

const HEADER_SIZE: usize = 0x70;
const NO_OFFSET: u32 = 0;

const STRING_IDS_SIZE: usize = 0x38;
const TYPE_IDS_SIZE: usize = 0x40;
const PROTO_IDS_SIZE: usize = 0x48;
const METHOD_IDS_SIZE: usize = 0x58;
const CLASS_DEFS_SIZE: usize = 0x60;

const CLASS_DEF_ITEM_SIZE: usize = 32;
const PROTO_ID_ITEM_SIZE: usize = 12;
const METHOD_ID_ITEM_SIZE: usize = 8;

/// Scans dex files for `@AliucordPlugin` classes
#[derive(Debug, Default, Clone, Copy)]
pub struct DexScanner;

impl DexScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan one dex image
    pub fn scan_bytes(&self, path: &Path, data: &[u8]) -> Result<Vec<EntryPointCandidate>, BuildError> {
        DexFile::parse(path, data)?.plugin_classes()
    }

    /// Dex images at `code`: a directory, a `.dex` file or an archive
    fn load(&self, code: &Path) -> Result<Vec<(PathBuf, Vec<u8>)>, BuildError> {
        if code.is_dir() {
            let mut images = Vec::new();
            for entry in WalkDir::new(code).sort_by_file_name() {
                let entry = entry.map_err(|e| BuildError::Io(e.into()))?;
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().map(|e| e == "dex").unwrap_or(false) {
                    images.push((path.to_path_buf(), std::fs::read(path)?));
                }
            }
            return Ok(images);
        }

        if code.extension().map(|e| e == "dex").unwrap_or(false) {
            return Ok(vec![(code.to_path_buf(), std::fs::read(code)?)]);
        }

        let mut archive = ZipArchive::new(File::open(code)?)?;
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.ends_with(".dex"))
            .map(str::to_string)
            .collect();
        names.sort();

        let mut images = Vec::with_capacity(names.len());
        for name in names {
            let mut file = archive.by_name(&name)?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            images.push((code.join(&name), data));
        }
        Ok(images)
    }
}

impl EntryPointDiscovery for DexScanner {
    fn discover(&self, code: &Path) -> Result<Vec<EntryPointCandidate>, BuildError> {
        let mut candidates = Vec::new();

        for (path, data) in self.load(code)? {
            let found = self.scan_bytes(&path, &data)?;
            debug!("{:?}: {} plugin class(es)", path, found.len());
            candidates.extend(found);
        }

        Ok(candidates)
    }
}

/// Read-only view of a dex image
struct DexFile<'a> {
    path: &'a Path,
    data: &'a [u8],
}

impl<'a> DexFile<'a> {
    fn parse(path: &'a Path, data: &'a [u8]) -> Result<Self, BuildError> {
        let dex = Self { path, data };
        if data.len() < HEADER_SIZE || !data.starts_with(b"dex\n") {
            return Err(dex.invalid("missing dex header"));
        }
        Ok(dex)
    }

    fn invalid(&self, message: impl Into<String>) -> BuildError {
        BuildError::InvalidDex {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn u16_at(&self, offset: usize) -> Result<u16, BuildError> {
        self.data
            .get(offset..offset + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| self.invalid(format!("read past end at {:#x}", offset)))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, BuildError> {
        self.data
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| self.invalid(format!("read past end at {:#x}", offset)))
    }

    fn uleb128(&self, offset: &mut usize) -> Result<u32, BuildError> {
        let mut result: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = *self
                .data
                .get(*offset)
                .ok_or_else(|| self.invalid(format!("truncated uleb128 at {:#x}", offset)))?;
            *offset += 1;
            result |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(self.invalid("uleb128 longer than five bytes"))
    }

    /// `(size, offset)` of a header section
    fn section(&self, size_field: usize) -> Result<(u32, usize), BuildError> {
        Ok((self.u32_at(size_field)?, self.u32_at(size_field + 4)? as usize))
    }

    fn item_offset(&self, size_field: usize, index: u32, item_size: usize) -> Result<usize, BuildError> {
        let (count, base) = self.section(size_field)?;
        if index >= count {
            return Err(self.invalid(format!("index {} out of range at {:#x}", index, size_field)));
        }
        Ok(base + index as usize * item_size)
    }

    fn string(&self, index: u32) -> Result<String, BuildError> {
        let id = self.item_offset(STRING_IDS_SIZE, index, 4)?;
        let mut offset = self.u32_at(id)? as usize;
        self.uleb128(&mut offset)?;

        let rest = self
            .data
            .get(offset..)
            .ok_or_else(|| self.invalid("string data out of range"))?;
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.invalid("unterminated string"))?;
        Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
    }

    fn type_descriptor(&self, index: u32) -> Result<String, BuildError> {
        let id = self.item_offset(TYPE_IDS_SIZE, index, 4)?;
        self.string(self.u32_at(id)?)
    }

    fn method_name(&self, index: u32) -> Result<String, BuildError> {
        let id = self.item_offset(METHOD_IDS_SIZE, index, METHOD_ID_ITEM_SIZE)?;
        self.string(self.u32_at(id + 4)?)
    }

    /// `(params)return` descriptor of a method
    fn method_descriptor(&self, index: u32) -> Result<String, BuildError> {
        let id = self.item_offset(METHOD_IDS_SIZE, index, METHOD_ID_ITEM_SIZE)?;
        let proto_index = u32::from(self.u16_at(id + 2)?);
        let proto = self.item_offset(PROTO_IDS_SIZE, proto_index, PROTO_ID_ITEM_SIZE)?;

        let mut descriptor = String::from("(");
        let params = self.u32_at(proto + 8)?;
        if params != NO_OFFSET {
            let params = params as usize;
            let count = self.u32_at(params)? as usize;
            for i in 0..count {
                let type_index = self.u16_at(params + 4 + i * 2)?;
                descriptor.push_str(&self.type_descriptor(u32::from(type_index))?);
            }
        }
        descriptor.push(')');
        descriptor.push_str(&self.type_descriptor(self.u32_at(proto + 4)?)?);
        Ok(descriptor)
    }

    fn plugin_classes(&self) -> Result<Vec<EntryPointCandidate>, BuildError> {
        let (count, base) = self.section(CLASS_DEFS_SIZE)?;
        let mut candidates = Vec::new();

        for i in 0..count as usize {
            let class_def = base + i * CLASS_DEF_ITEM_SIZE;
            let annotations = self.u32_at(class_def + 20)?;
            if !self.has_plugin_annotation(annotations)? {
                continue;
            }

            let descriptor = self.type_descriptor(self.u32_at(class_def)?)?;
            let class_data = self.u32_at(class_def + 24)?;
            candidates.push(EntryPointCandidate {
                class_name: descriptor_to_class_name(&descriptor),
                overrides_reserved: self.declares_reserved_method(class_data)?,
            });
        }

        Ok(candidates)
    }

    fn has_plugin_annotation(&self, directory: u32) -> Result<bool, BuildError> {
        if directory == NO_OFFSET {
            return Ok(false);
        }

        let set = self.u32_at(directory as usize)?;
        if set == NO_OFFSET {
            return Ok(false);
        }

        let set = set as usize;
        let size = self.u32_at(set)? as usize;
        for i in 0..size {
            // annotation_item: visibility byte, then the encoded annotation
            let mut offset = self.u32_at(set + 4 + i * 4)? as usize + 1;
            let type_index = self.uleb128(&mut offset)?;
            if self.type_descriptor(type_index)? == PLUGIN_ANNOTATION {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn declares_reserved_method(&self, class_data: u32) -> Result<bool, BuildError> {
        if class_data == NO_OFFSET {
            return Ok(false);
        }

        let mut offset = class_data as usize;
        let static_fields = self.uleb128(&mut offset)?;
        let instance_fields = self.uleb128(&mut offset)?;
        let direct_methods = self.uleb128(&mut offset)?;
        let virtual_methods = self.uleb128(&mut offset)?;

        let fields = static_fields
            .checked_add(instance_fields)
            .ok_or_else(|| self.invalid(format!("field count overflows at {:#x}", class_data)))?;
        for _ in 0..fields {
            self.uleb128(&mut offset)?;
            self.uleb128(&mut offset)?;
        }

        for method_count in [direct_methods, virtual_methods] {
            let mut method_index = 0u32;
            for _ in 0..method_count {
                let delta = self.uleb128(&mut offset)?;
                method_index = method_index
                    .checked_add(delta)
                    .ok_or_else(|| self.invalid(format!("method index overflows at {:#x}", class_data)))?;
                self.uleb128(&mut offset)?;
                self.uleb128(&mut offset)?;

                if self.method_name(method_index)? == RESERVED_METHOD
                    && self.method_descriptor(method_index)? == RESERVED_METHOD_DESCRIPTOR
                {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
