//! [COPC](https://copc.io/) structures: the info vlr and the octree
//! hierarchy.
//!
//! A cloud-optimized point cloud is a LAZ 1.4 file carrying two extra
//! records: an info vlr (always the first vlr in the file) describing the
//! octree's cube and the location of the root hierarchy page, and a
//! hierarchy evlr holding one or more pages of [entries](Entry). Each entry
//! either addresses a chunk of point data, marks an empty-but-navigable
//! octree node, or points at a child page. [resolve_hierarchy] flattens the
//! paged structure into a plain entry list.

use crate::{Bounds, Error, Header, Result, Vector, Vlr};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::warn;
use std::collections::{HashSet, VecDeque};
use std::io::{Read, Write};

/// The user id of the COPC vlrs.
pub const USER_ID: &str = "copc";

/// The record id of the COPC hierarchy evlr.
pub const HIERARCHY_RECORD_ID: u16 = 1000;

/// The size of one hierarchy entry on disk.
pub const ENTRY_SIZE: usize = 32;

/// The COPC info vlr.
///
/// Must be the first vlr in the file, 160 bytes of payload.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CopcInfo {
    /// Actual (unscaled) coordinates of the center of the octree.
    pub center: Vector<f64>,
    /// Perpendicular distance from the center to any side of the root node.
    pub halfsize: f64,
    /// Space between points at the root node.
    ///
    /// This value is halved at each octree level.
    pub spacing: f64,
    /// File offset to the first hierarchy page.
    pub root_hier_offset: u64,
    /// Size of the first hierarchy page in bytes.
    pub root_hier_size: u64,
    /// Minimum of GPSTime.
    pub gpstime_minimum: f64,
    /// Maximum of GPSTime.
    pub gpstime_maximum: f64,
}

impl CopcInfo {
    /// The record id of the COPC info vlr.
    pub const RECORD_ID: u16 = 1;

    /// Reads the info from a vlr payload.
    ///
    /// This only reads the payload data; the vlr header should already be
    /// read.
    pub fn read_from<R: Read>(mut read: R) -> Result<CopcInfo> {
        let info = CopcInfo {
            center: Vector {
                x: read.read_f64::<LittleEndian>()?,
                y: read.read_f64::<LittleEndian>()?,
                z: read.read_f64::<LittleEndian>()?,
            },
            halfsize: read.read_f64::<LittleEndian>()?,
            spacing: read.read_f64::<LittleEndian>()?,
            root_hier_offset: read.read_u64::<LittleEndian>()?,
            root_hier_size: read.read_u64::<LittleEndian>()?,
            gpstime_minimum: read.read_f64::<LittleEndian>()?,
            gpstime_maximum: read.read_f64::<LittleEndian>()?,
        };
        for _ in 0..11 {
            let _reserved = read.read_u64::<LittleEndian>()?;
        }
        Ok(info)
    }

    /// Writes the info as a vlr payload.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_f64::<LittleEndian>(self.center.x)?;
        write.write_f64::<LittleEndian>(self.center.y)?;
        write.write_f64::<LittleEndian>(self.center.z)?;
        write.write_f64::<LittleEndian>(self.halfsize)?;
        write.write_f64::<LittleEndian>(self.spacing)?;
        write.write_u64::<LittleEndian>(self.root_hier_offset)?;
        write.write_u64::<LittleEndian>(self.root_hier_size)?;
        write.write_f64::<LittleEndian>(self.gpstime_minimum)?;
        write.write_f64::<LittleEndian>(self.gpstime_maximum)?;
        for _ in 0..11 {
            write.write_u64::<LittleEndian>(0)?;
        }
        Ok(())
    }

    /// The cube of the root octree node.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::copc::CopcInfo;
    /// let info = CopcInfo { halfsize: 1., ..Default::default() };
    /// assert_eq!(-1., info.root_bounds().min.x);
    /// assert_eq!(1., info.root_bounds().max.z);
    /// ```
    pub fn root_bounds(&self) -> Bounds {
        Bounds::new(
            self.center.x - self.halfsize,
            self.center.y - self.halfsize,
            self.center.z - self.halfsize,
            self.center.x + self.halfsize,
            self.center.y + self.halfsize,
            self.center.z + self.halfsize,
        )
    }
}

impl TryFrom<&Vlr> for CopcInfo {
    type Error = Error;

    fn try_from(vlr: &Vlr) -> Result<CopcInfo> {
        CopcInfo::read_from(vlr.data.as_slice())
    }
}

/// The address of an octree node, following the EPT data naming scheme.
///
/// The scheme is depth-x-y-z: the root is `0-0-0-0`, and each node has up to
/// eight children whose coordinates are obtained by doubling and adding an
/// octant bit per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelKey {
    /// The octree level, zero for the root.
    ///
    /// A value < 0 indicates an invalid key.
    pub depth: i32,
    /// X index at this depth.
    pub x: i32,
    /// Y index at this depth.
    pub y: i32,
    /// Z index at this depth.
    pub z: i32,
}

impl VoxelKey {
    /// The root node of the octree.
    pub const ROOT: VoxelKey = VoxelKey {
        depth: 0,
        x: 0,
        y: 0,
        z: 0,
    };

    /// Is this a valid key?
    ///
    /// A key is valid iff all four components are non-negative.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::copc::VoxelKey;
    /// assert!(VoxelKey::ROOT.is_valid());
    /// assert!(!VoxelKey { depth: -1, x: 0, y: 0, z: 0 }.is_valid());
    /// ```
    pub fn is_valid(&self) -> bool {
        self.depth >= 0 && self.x >= 0 && self.y >= 0 && self.z >= 0
    }

    /// Computes a child of this key.
    ///
    /// `direction` selects the octant and must be in 0..8: bit 0 is x, bit 1
    /// is y, bit 2 is z.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::copc::VoxelKey;
    /// let child = VoxelKey::ROOT.child(5).unwrap();
    /// assert_eq!(1, child.depth);
    /// assert_eq!((1, 0, 1), (child.x, child.y, child.z));
    /// ```
    pub fn child(&self, direction: i32) -> Result<VoxelKey> {
        if !(0..8).contains(&direction) {
            return Err(Error::InvalidOctantDirection(direction));
        }
        Ok(VoxelKey {
            depth: self.depth + 1,
            x: (self.x << 1) | (direction & 0x1),
            y: (self.y << 1) | ((direction >> 1) & 0x1),
            z: (self.z << 1) | ((direction >> 2) & 0x1),
        })
    }

    /// Computes the parent key.
    ///
    /// The parent of the root is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::copc::VoxelKey;
    /// assert!(!VoxelKey::ROOT.parent().is_valid());
    /// ```
    pub fn parent(&self) -> VoxelKey {
        VoxelKey {
            depth: self.depth - 1,
            x: self.x >> 1,
            y: self.y >> 1,
            z: self.z >> 1,
        }
    }

    /// The cube this key occupies inside the root cube.
    ///
    /// Every octree cell is a cube with edge `root_edge / 2^depth`.
    pub fn bounds(&self, root: &Bounds) -> Bounds {
        let edge = (root.max.x - root.min.x) / f64::from(1u32 << self.depth.clamp(0, 31));
        Bounds::new(
            root.min.x + f64::from(self.x) * edge,
            root.min.y + f64::from(self.y) * edge,
            root.min.z + f64::from(self.z) * edge,
            root.min.x + f64::from(self.x + 1) * edge,
            root.min.y + f64::from(self.y + 1) * edge,
            root.min.z + f64::from(self.z + 1) * edge,
        )
    }

    /// Reads a key from a hierarchy page.
    pub fn read_from<R: Read>(read: &mut R) -> Result<VoxelKey> {
        Ok(VoxelKey {
            depth: read.read_i32::<LittleEndian>()?,
            x: read.read_i32::<LittleEndian>()?,
            y: read.read_i32::<LittleEndian>()?,
            z: read.read_i32::<LittleEndian>()?,
        })
    }

    /// Writes a key to a hierarchy page.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_i32::<LittleEndian>(self.depth)?;
        write.write_i32::<LittleEndian>(self.x)?;
        write.write_i32::<LittleEndian>(self.y)?;
        write.write_i32::<LittleEndian>(self.z)?;
        Ok(())
    }
}

/// One key/value pair of the octree hierarchy, 32 bytes on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Entry {
    /// The EPT key of the octree node this entry corresponds to.
    pub key: VoxelKey,
    /// Absolute file offset of the data chunk if `point_count` > 0, of a
    /// child hierarchy page if `point_count` is -1, zero otherwise.
    pub offset: u64,
    /// Size of the data chunk (or child page) in bytes.
    pub byte_size: i32,
    /// The number of points in the data chunk, 0 for an empty-but-navigable
    /// node, or -1 if this entry points at a child hierarchy page.
    pub point_count: i32,
}

impl Default for VoxelKey {
    fn default() -> VoxelKey {
        VoxelKey {
            depth: -1,
            x: 0,
            y: 0,
            z: 0,
        }
    }
}

impl Entry {
    /// Reads a hierarchy entry.
    pub fn read_from<R: Read>(read: &mut R) -> Result<Entry> {
        Ok(Entry {
            key: VoxelKey::read_from(read)?,
            offset: read.read_u64::<LittleEndian>()?,
            byte_size: read.read_i32::<LittleEndian>()?,
            point_count: read.read_i32::<LittleEndian>()?,
        })
    }

    /// Writes a hierarchy entry.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        self.key.write_to(write)?;
        write.write_u64::<LittleEndian>(self.offset)?;
        write.write_i32::<LittleEndian>(self.byte_size)?;
        write.write_i32::<LittleEndian>(self.point_count)?;
        Ok(())
    }

    /// Does this entry forward to a child hierarchy page?
    pub fn is_page_pointer(&self) -> bool {
        self.point_count == -1
    }
}

fn read_page(mut data: &[u8]) -> Result<Vec<Entry>> {
    (0..data.len() / ENTRY_SIZE)
        .map(|_| Entry::read_from(&mut data))
        .collect()
}

/// Flattens the paged hierarchy of a COPC file into a plain entry list.
///
/// Starting from the declared root page, child page pointers are dequeued
/// breadth-first until every page is resolved. The result holds real
/// entries only (leaf chunks and empty-but-navigable nodes); page pointers
/// are consumed by the traversal. Missing or malformed pages are skipped
/// with a warning so a partially corrupt hierarchy still yields its sound
/// parts.
pub fn resolve_hierarchy(vlr: &Vlr, info: &CopcInfo) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut pages = VecDeque::new();
    let mut seen = HashSet::new();
    pages.push_back((0u64, info.root_hier_size));
    while let Some((start, size)) = pages.pop_front() {
        if !seen.insert(start) {
            warn!("hierarchy page at payload offset {start} is referenced twice, skipping");
            continue;
        }
        let end = start.saturating_add(size);
        let Some(bytes) = vlr
            .data
            .get(usize::try_from(start)?..usize::try_from(end)?)
        else {
            warn!("hierarchy page {start}..{end} is outside of the evlr payload, skipping");
            continue;
        };
        for entry in read_page(bytes)? {
            if !entry.key.is_valid() {
                warn!("skipping hierarchy entry with invalid key {:?}", entry.key);
            } else if entry.is_page_pointer() {
                if entry.offset < info.root_hier_offset {
                    warn!("hierarchy page pointer at {} precedes the root page", entry.offset);
                    continue;
                }
                pages.push_back((entry.offset - info.root_hier_offset, entry.byte_size as u64));
            } else {
                entries.push(entry);
            }
        }
    }
    Ok(entries)
}

impl Vlr {
    /// Returns true if this vlr is the COPC info vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::Vlr;
    /// let mut vlr = Vlr::default();
    /// assert!(!vlr.is_copc_info());
    /// vlr.user_id = "copc".to_string();
    /// vlr.record_id = 1;
    /// assert!(vlr.is_copc_info());
    /// ```
    pub fn is_copc_info(&self) -> bool {
        self.user_id == USER_ID && self.record_id == CopcInfo::RECORD_ID
    }

    /// Returns true if this vlr is the COPC hierarchy evlr.
    pub fn is_copc_hierarchy(&self) -> bool {
        self.user_id == USER_ID && self.record_id == HIERARCHY_RECORD_ID
    }
}

impl Header {
    /// Returns this header's COPC info, if the file carries one.
    pub fn copc_info(&self) -> Result<CopcInfo> {
        self.vlrs
            .iter()
            .find(|vlr| vlr.is_copc_info())
            .map_or(Err(Error::CopcInfoNotFound), |vlr| vlr.try_into())
    }

    /// Resolves this header's COPC hierarchy into a flat entry list.
    pub fn copc_hierarchy_entries(&self) -> Result<Vec<Entry>> {
        let info = self.copc_info()?;
        self.evlrs
            .iter()
            .chain(self.vlrs.iter())
            .find(|vlr| vlr.is_copc_hierarchy())
            .map_or(Err(Error::CopcHierarchyNotFound), |vlr| {
                resolve_hierarchy(vlr, &info)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxel_key_children() {
        let children = (0..8)
            .map(|direction| VoxelKey::ROOT.child(direction))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(children.iter().all(|child| child.parent() == VoxelKey::ROOT));
        assert!(children
            .iter()
            .all(|child| (0..8).all(|d| child.child(d).unwrap().parent() == *child)));
        assert!(VoxelKey::ROOT.child(8).is_err());
    }

    #[test]
    fn voxel_key_bounds() {
        let root = Bounds::new(0., 0., 0., 8., 8., 8.);
        let key = VoxelKey {
            depth: 2,
            x: 1,
            y: 2,
            z: 3,
        };
        assert_eq!(Bounds::new(2., 4., 6., 4., 6., 8.), key.bounds(&root));
    }

    #[test]
    fn info_round_trip() {
        let info = CopcInfo {
            center: Vector {
                x: 1.,
                y: 2.,
                z: 3.,
            },
            halfsize: 4.,
            spacing: 5.,
            root_hier_offset: 6,
            root_hier_size: 7,
            gpstime_minimum: 8.,
            gpstime_maximum: 9.,
        };
        let mut data = Vec::new();
        info.write_to(&mut data).unwrap();
        assert_eq!(160, data.len());
        assert_eq!(info, CopcInfo::read_from(data.as_slice()).unwrap());
    }

    fn entry(key: VoxelKey, offset: u64, byte_size: i32, point_count: i32) -> Entry {
        Entry {
            key,
            offset,
            byte_size,
            point_count,
        }
    }

    #[test]
    fn resolve_nested_pages() {
        // Root page: one leaf and one pointer to a child page holding two
        // leaves.
        let info = CopcInfo {
            root_hier_offset: 1000,
            root_hier_size: 2 * ENTRY_SIZE as u64,
            ..Default::default()
        };
        let child = VoxelKey::ROOT.child(0).unwrap();
        let mut data = Vec::new();
        entry(VoxelKey::ROOT, 5000, 100, 10)
            .write_to(&mut data)
            .unwrap();
        entry(child, 1000 + 2 * ENTRY_SIZE as u64, 2 * ENTRY_SIZE as i32, -1)
            .write_to(&mut data)
            .unwrap();
        entry(child.child(0).unwrap(), 5100, 100, 20)
            .write_to(&mut data)
            .unwrap();
        entry(child.child(1).unwrap(), 0, 0, 0)
            .write_to(&mut data)
            .unwrap();
        let vlr = Vlr {
            user_id: USER_ID.to_string(),
            record_id: HIERARCHY_RECORD_ID,
            data,
            ..Default::default()
        };
        let entries = resolve_hierarchy(&vlr, &info).unwrap();
        assert_eq!(3, entries.len());
        assert_eq!(10, entries[0].point_count);
        assert_eq!(20, entries[1].point_count);
        assert_eq!(0, entries[2].point_count);
    }

    #[test]
    fn missing_page_is_skipped() {
        let info = CopcInfo {
            root_hier_offset: 1000,
            root_hier_size: ENTRY_SIZE as u64,
            ..Default::default()
        };
        let mut data = Vec::new();
        entry(VoxelKey::ROOT, 9000, 64, -1).write_to(&mut data).unwrap();
        let vlr = Vlr {
            user_id: USER_ID.to_string(),
            record_id: HIERARCHY_RECORD_ID,
            data,
            ..Default::default()
        };
        let entries = resolve_hierarchy(&vlr, &info).unwrap();
        assert!(entries.is_empty());
    }
}
