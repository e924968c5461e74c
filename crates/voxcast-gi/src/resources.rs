use voxcast_core::{GridConfig, ProjectionDevice, VolumeExtent, VoxcastError};

use crate::backend::{CascadeBackend, VolumeRole};

/// The geometry and light volumes, always created, replaced and dropped as a
/// pair.
pub struct CascadeVolumes<V> {
    pub geometry: V,
    pub light: V,
    extent: VolumeExtent,
}

impl<V> CascadeVolumes<V> {
    pub fn extent(&self) -> VolumeExtent {
        self.extent
    }

    pub fn get(&self, role: VolumeRole) -> &V {
        match role {
            VolumeRole::Geometry => &self.geometry,
            VolumeRole::Light => &self.light,
        }
    }
}

/// Everything one refresh needs from `CascadeResources`, borrowed together.
pub struct RefreshParts<'a, V> {
    pub volumes: &'a CascadeVolumes<V>,
    pub projection: &'a mut ProjectionDevice,
    /// Whether this call (re)allocated the volume pair.
    pub reallocated: bool,
}

/// Owns both packed volumes and the projection device.
///
/// Volumes are recreated only when the requested footprint changes; the old
/// pair is dropped (and its GPU memory destroyed) before the new one is
/// allocated. Not reentrant: every entry point takes `&mut self`.
pub struct CascadeResources<V> {
    volumes: Option<CascadeVolumes<V>>,
    projection: Option<ProjectionDevice>,
    allocation_events: u64,
    idle_reported: bool,
}

impl<V> Default for CascadeResources<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CascadeResources<V> {
    pub fn new() -> Self {
        Self {
            volumes: None,
            projection: None,
            allocation_events: 0,
            idle_reported: false,
        }
    }

    /// Make sure volumes matching `config` exist.
    ///
    /// Returns `None` for an inactive configuration; any previous volumes are
    /// destroyed in that case and nothing is allocated.
    pub fn ensure_resources<B>(
        &mut self,
        backend: &mut B,
        config: &GridConfig,
    ) -> Result<Option<&CascadeVolumes<V>>, VoxcastError>
    where
        B: CascadeBackend<Volume = V>,
    {
        let wanted = config.volume_extent()?;
        let up_to_date = matches!(
            (&self.volumes, wanted),
            (Some(current), Some(extent)) if current.extent == extent
        );
        if up_to_date {
            return Ok(self.volumes.as_ref());
        }

        self.volumes = None;

        let Some(extent) = wanted else {
            if !self.idle_reported {
                log::warn!(
                    "Cascade grid inactive (resolution={}, cascades={}, pixel size={}); lighting will not update",
                    config.resolution,
                    config.cascade_count,
                    config.voxel_pixel_size,
                );
                self.idle_reported = true;
            }
            return Ok(None);
        };
        self.idle_reported = false;

        log::info!(
            "Creating cascade volumes: {}x{}x{} ({} cascades of {}^3)",
            extent.width,
            extent.height,
            extent.depth,
            config.cascade_count,
            config.resolution,
        );
        let geometry = backend.create_volume(VolumeRole::Geometry, extent)?;
        let light = backend.create_volume(VolumeRole::Light, extent)?;
        self.allocation_events += 1;

        self.volumes = Some(CascadeVolumes {
            geometry,
            light,
            extent,
        });
        Ok(self.volumes.as_ref())
    }

    pub fn volumes(&self) -> Option<&CascadeVolumes<V>> {
        self.volumes.as_ref()
    }

    /// The projection device, created on first use.
    pub fn projection_device(&mut self) -> &mut ProjectionDevice {
        self.projection.get_or_insert_with(ProjectionDevice::new)
    }

    /// The projection device if it was ever created.
    pub fn existing_projection_device(&self) -> Option<&ProjectionDevice> {
        self.projection.as_ref()
    }

    /// `ensure_resources`, then hand out the volumes together with the
    /// projection device. `None` for an inactive configuration.
    pub fn ensure_parts<B>(
        &mut self,
        backend: &mut B,
        config: &GridConfig,
    ) -> Result<Option<RefreshParts<'_, V>>, VoxcastError>
    where
        B: CascadeBackend<Volume = V>,
    {
        let before = self.allocation_events;
        self.ensure_resources(backend, config)?;
        let reallocated = self.allocation_events != before;

        let projection = &mut self.projection;
        Ok(self.volumes.as_ref().map(|volumes| RefreshParts {
            volumes,
            projection: projection.get_or_insert_with(ProjectionDevice::new),
            reallocated,
        }))
    }

    /// Number of times a volume pair has been allocated.
    pub fn allocation_events(&self) -> u64 {
        self.allocation_events
    }

    /// Drop both volumes now.
    pub fn release(&mut self) {
        self.volumes = None;
    }
}
