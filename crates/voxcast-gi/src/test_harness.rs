//! Recording backend for GPU-free orchestration tests.
//!
//! Every backend call, plus every volume/scratch drop, is appended to a
//! shared event log so tests can assert on allocation counts and dispatch
//! order.

use std::cell::RefCell;
use std::rc::Rc;

use voxcast_core::{CullingMask, DispatchSize, ProjectionDevice, VolumeExtent, VoxcastError};

use crate::backend::{CascadeBackend, CascadeParams, KernelBinding, VolumeRole};
use crate::kernels::Kernel;
use crate::publish::GiGlobals;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateVolume(VolumeRole, VolumeExtent),
    DestroyVolume(VolumeRole),
    CreateScratch(u32),
    ReleaseScratch(u32),
    Dispatch {
        kernel: Kernel,
        params: CascadeParams,
        size: DispatchSize,
    },
    Rasterize {
        half_extent: f32,
        culling_mask: CullingMask,
    },
    Flush,
    Extract {
        role: VolumeRole,
        cascade_base: u32,
    },
    Publish(GiGlobals),
    Retract,
}

type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct RecordedVolume {
    pub role: VolumeRole,
    log: EventLog,
}

impl Drop for RecordedVolume {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::DestroyVolume(self.role));
    }
}

pub struct RecordedScratch {
    pub id: u32,
    log: EventLog,
}

impl Drop for RecordedScratch {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::ReleaseScratch(self.id));
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    log: EventLog,
    next_scratch: u32,
    /// When set, `create_volume` for this role fails like an out-of-memory
    /// allocation.
    pub fail_allocation: Option<VolumeRole>,
    /// When set, every `create_scratch` fails.
    pub fail_scratch: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn dispatches(&self) -> Vec<(Kernel, CascadeParams, DispatchSize)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Dispatch {
                    kernel,
                    params,
                    size,
                } => Some((*kernel, *params, *size)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.log.borrow().iter().filter(|event| matches(event)).count()
    }
}

impl CascadeBackend for RecordingBackend {
    type Volume = RecordedVolume;
    type Scratch = RecordedScratch;

    fn create_volume(
        &mut self,
        role: VolumeRole,
        extent: VolumeExtent,
    ) -> Result<RecordedVolume, VoxcastError> {
        if self.fail_allocation == Some(role) {
            return Err(VoxcastError::AllocationFailed {
                label: role.label().to_string(),
                reason: "out of memory".to_string(),
            });
        }
        self.log.borrow_mut().push(Event::CreateVolume(role, extent));
        Ok(RecordedVolume {
            role,
            log: Rc::clone(&self.log),
        })
    }

    fn create_scratch(&mut self, resolution: u32) -> Result<RecordedScratch, VoxcastError> {
        if self.fail_scratch {
            return Err(VoxcastError::AllocationFailed {
                label: "voxelize-scratch".to_string(),
                reason: "out of memory".to_string(),
            });
        }
        let id = self.next_scratch;
        self.next_scratch += 1;
        self.log.borrow_mut().push(Event::CreateScratch(resolution));
        Ok(RecordedScratch {
            id,
            log: Rc::clone(&self.log),
        })
    }

    fn dispatch(
        &mut self,
        binding: KernelBinding<'_, RecordedScratch, RecordedVolume>,
        params: CascadeParams,
        size: DispatchSize,
    ) {
        if let KernelBinding::Trace { geometry, light } = &binding {
            assert_eq!(geometry.role, VolumeRole::Geometry);
            assert_eq!(light.role, VolumeRole::Light);
        }
        self.log.borrow_mut().push(Event::Dispatch {
            kernel: binding.kernel(),
            params,
            size,
        });
    }

    fn rasterize(&mut self, _scratch: &RecordedScratch, device: &ProjectionDevice) {
        self.log.borrow_mut().push(Event::Rasterize {
            half_extent: device.half_extent(),
            culling_mask: device.culling_mask(),
        });
    }

    fn flush(&mut self) {
        self.log.borrow_mut().push(Event::Flush);
    }

    fn extract(
        &mut self,
        source: &RecordedVolume,
        params: CascadeParams,
        _size: DispatchSize,
    ) -> Result<Vec<f32>, VoxcastError> {
        self.log.borrow_mut().push(Event::Extract {
            role: source.role,
            cascade_base: params.cascade_base,
        });
        let n = params.grid_resolution as usize;
        Ok((0..n * n * n).map(|i| i as f32).collect())
    }

    fn publish(&mut self, globals: &GiGlobals, light: &RecordedVolume) {
        assert_eq!(light.role, VolumeRole::Light);
        self.log.borrow_mut().push(Event::Publish(*globals));
    }

    fn retract(&mut self) {
        self.log.borrow_mut().push(Event::Retract);
    }
}
