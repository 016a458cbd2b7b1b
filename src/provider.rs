use crate::codec::{ChunkCodec, TileEntityHooks};
use crate::error::{RegionLoadError, RegionSaveError};
use crate::position::RegionPosition;
use crate::region::RegionStore;
use log::debug;
use std::fs::{read_dir, File};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs, io};

/// Region files of one world dimension, named `r.<x>.<z>.mca`.
pub struct FolderRegionProvider {
    /// Folder where region files located.
    folder_path: PathBuf,
}

impl FolderRegionProvider {
    pub fn new<P: AsRef<Path>>(folder: P) -> FolderRegionProvider {
        let folder_path = folder.as_ref().to_path_buf();

        FolderRegionProvider { folder_path }
    }

    pub fn region_path(&self, position: RegionPosition) -> PathBuf {
        self.folder_path.join(region_position_filename(position))
    }

    pub fn iter_positions(&self) -> Result<impl Iterator<Item = RegionPosition>, io::Error> {
        let positions: Vec<_> = read_dir(&self.folder_path)?
            .filter_map(|dir| dir.ok())
            .filter_map(|dir| region_pos_from_filename(&dir.path()).ok())
            .collect();

        Ok(positions.into_iter())
    }

    /// Loads region, missing file gives empty region.
    pub fn load_region<K, H>(
        &self,
        position: RegionPosition,
        codec: K,
        hooks: H,
    ) -> Result<RegionStore<K, H>, RegionLoadError>
    where
        K: ChunkCodec,
        H: TileEntityHooks<K::Chunk>,
    {
        let region_path = self.region_path(position);

        let file = match File::open(&region_path) {
            Ok(file) => file,
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    target: "region-store",
                    "Region file {} not found, starting empty",
                    region_path.display()
                );

                return Ok(RegionStore::with_hooks(position, codec, hooks));
            }
            Err(e) => return Err(e.into()),
        };

        RegionStore::load(position, codec, hooks, file)
    }

    /// Saves region into temporary file and renames it over the region file,
    /// so a failed save never leaves a half written region behind.
    pub fn save_region<K, H>(&self, region: &mut RegionStore<K, H>) -> Result<(), RegionSaveError>
    where
        K: ChunkCodec,
        H: TileEntityHooks<K::Chunk>,
    {
        if !self.folder_path.exists() {
            fs::create_dir_all(&self.folder_path)?;
        }

        let region_path = self.region_path(region.position());
        let temporary_path = region_path.with_extension("mca.tmp");

        let file = File::create(&temporary_path)?;
        let mut writer = BufWriter::new(file);

        if let Err(e) = region.save(&mut writer) {
            if let Err(remove_error) = fs::remove_file(&temporary_path) {
                debug!(
                    target: "region-store",
                    "Failed to remove temporary region file {}: {}",
                    temporary_path.display(),
                    remove_error
                );
            }

            return Err(e);
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temporary_path, &region_path)?;

        debug!(
            target: "region-store",
            "Region {} saved to {}",
            region.position(),
            region_path.display()
        );

        Ok(())
    }
}

fn region_pos_from_filename(path: &Path) -> Result<RegionPosition, io::Error> {
    // we can use lossy because of the bound check later
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    let parts: Vec<_> = filename.split('.').collect();

    let (x, z) = parse_coords(parts).ok_or(ErrorKind::InvalidInput)?;

    Ok(RegionPosition::new(x, z))
}

fn region_position_filename(pos: RegionPosition) -> String {
    format!("r.{}.{}.mca", pos.x, pos.z)
}

fn parse_coords(parts: Vec<&str>) -> Option<(i32, i32)> {
    let incorrect_format = parts.len() != 4 || parts[0] != "r" || parts[3] != "mca";

    if incorrect_format {
        return None;
    }

    Some((i32::from_str(parts[1]).ok()?, i32::from_str(parts[2]).ok()?))
}
