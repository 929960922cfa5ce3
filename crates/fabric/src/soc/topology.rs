//! Topology composition and the top-level system type.
//!
//! [`SoC::new`] elaborates a [`Config`] into one of the statically known
//! topology variants, once, at build time. It performs:
//! 1. **Per-hart plumbing:** A coherence domain fronting a 2-to-1 merge of
//!    the post-coherence fetch and data streams.
//! 2. **Memory path:** Optional prefetcher and shared cache spliced into
//!    the merged path, then the address mapper, then the outer port.
//! 3. **MMIO partition:** A static decode over the external-device region,
//!    the 64 KiB timer window, and the 64 MiB interrupt-controller window.
//! 4. **Interrupt wiring:** One timer instance per hart and one shared
//!    external interrupt controller, their outputs routed back as typed
//!    per-hart lines rather than bus transactions.
//!
//! All structural invariants are checked here; after construction there is
//! no runtime failure mode in the topology itself.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::bus::arbiter::{ArbiterPolicy, BusArbiter};
use crate::bus::decoder::AddressMap;
use crate::bus::mapper::AddressMapper;
use crate::bus::port::BusSlave;
use crate::bus::transaction::{AccessKind, BusRequest, BusResponse};
use crate::coherence::broadcast::{BroadcastPort, CoherenceBroadcaster};
use crate::coherence::domain::{CoherenceDomain, MemPath};
use crate::coherence::{ProbeResponse, line_of};
use crate::common::{AddressRange, ConfigError};
use crate::config::{Config, TopologyVariant, UnmappedPolicy};
use crate::devices::{ExternalInterruptController, MachineTimer};
use crate::soc::cache::SharedCache;
use crate::soc::prefetch::NextLinePrefetcher;

/// Fixed size of the timer-controller MMIO window (64 KiB).
const CLINT_WINDOW: u64 = 0x1_0000;
/// Fixed size of the interrupt-controller MMIO window (64 MiB).
const PLIC_WINDOW: u64 = 0x400_0000;

/// Registered interrupt lines delivered to one hart, tagged by hart index
/// at construction; out-of-band signals, not bus transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IrqLines {
    /// Machine timer interrupt (`mtime >= mtimecmp`).
    pub timer: bool,
    /// Machine software interrupt (MSIP nonzero).
    pub software: bool,
    /// Resolved external interrupt from the interrupt controller.
    pub external: bool,
}

/// Region tags of the static MMIO partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MmioRegion {
    External,
    Timer,
    Plic,
}

/// Where one hart's in-flight MMIO transaction went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MmioTarget {
    /// Queued device access, performed at the next clock edge.
    Device(MmioRegion),
    /// Forwarded into the external-device arbiter.
    External,
    /// Unmapped under the permissive policy; answered with zero.
    Unmapped,
}

#[derive(Debug, Default)]
struct MmioPath {
    target: Option<MmioTarget>,
    queued: Option<BusRequest>,
    response: Option<BusResponse>,
}

/// The composed system: harts' coherence plumbing, memory path, MMIO
/// partition, and interrupt devices.
pub struct SoC {
    variant: TopologyVariant,
    domains: Vec<CoherenceDomain>,
    merges: Vec<BusArbiter>,
    broadcaster: Option<Rc<RefCell<CoherenceBroadcaster>>>,
    timers: Vec<MachineTimer>,
    plic: ExternalInterruptController,
    mmio_map: AddressMap,
    mmio_tags: Vec<MmioRegion>,
    mmio: Vec<MmioPath>,
    ext_mmio: BusArbiter,
    unmapped: UnmappedPolicy,
}

impl SoC {
    /// Elaborates the topology described by `config` over the outer memory
    /// port and the external-device MMIO port.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any structural invariant violation:
    /// unsupported core count, dual-core with a shared cache, a dangling
    /// prefetcher, or an overlapping MMIO partition.
    pub fn new(
        config: &Config,
        outer: Box<dyn BusSlave>,
        ext_mmio_port: Box<dyn BusSlave>,
    ) -> Result<Self, ConfigError> {
        let variant = config.variant()?;
        let harts = config.system.core_count;
        debug!(?variant, harts, "elaborating topology");

        // MMIO partition: external devices, timer window, interrupt window.
        let mut partition = vec![
            (config.system.ext_region, MmioRegion::External),
            (
                AddressRange::new(config.system.clint_base, CLINT_WINDOW),
                MmioRegion::Timer,
            ),
            (
                AddressRange::new(config.system.plic_base, PLIC_WINDOW),
                MmioRegion::Plic,
            ),
        ];
        partition.sort_by_key(|(range, _)| range.base);
        let mmio_map = AddressMap::new(partition.iter().map(|(r, _)| *r).collect())?;
        let mmio_tags = partition.into_iter().map(|(_, tag)| tag).collect();

        // Memory path below the merge points, innermost first.
        let mapper: Box<dyn BusSlave> =
            Box::new(AddressMapper::new(config.memory.map.clone(), outer)?);
        let mut broadcaster = None;
        let mut merges = Vec::with_capacity(harts);
        match variant {
            TopologyVariant::DualCore => {
                let shared = Rc::new(RefCell::new(CoherenceBroadcaster::new(harts, mapper)));
                for slot in 0..harts {
                    let port = Box::new(BroadcastPort::new(Rc::clone(&shared), slot));
                    merges.push(BusArbiter::new(2, port, ArbiterPolicy::FixedSlot));
                }
                broadcaster = Some(shared);
            }
            TopologyVariant::SingleCore
            | TopologyVariant::SingleCoreCache
            | TopologyVariant::SingleCoreCachePrefetch => {
                let mut path = mapper;
                if config.cache.enabled {
                    path = Box::new(SharedCache::new(
                        config.cache.size_bytes,
                        config.cache.latency,
                        path,
                    ));
                    if config.cache.prefetch {
                        path = Box::new(NextLinePrefetcher::new(path));
                    }
                }
                merges.push(BusArbiter::new(2, path, ArbiterPolicy::FixedSlot));
            }
        }

        let mut domains = Vec::with_capacity(harts);
        let mut timers = Vec::with_capacity(harts);
        let mut mmio = Vec::with_capacity(harts);
        for hart in 0..harts {
            domains.push(CoherenceDomain::new(hart));
            // One timer instance per hart, each servicing its own hart at
            // the instance-local index 0.
            timers.push(MachineTimer::new(1, &config.timer)?);
            mmio.push(MmioPath::default());
        }

        Ok(Self {
            variant,
            domains,
            merges,
            broadcaster,
            timers,
            plic: ExternalInterruptController::new(config.irq.sources, harts)?,
            mmio_map,
            mmio_tags,
            mmio,
            ext_mmio: BusArbiter::new(harts, ext_mmio_port, ArbiterPolicy::FixedSlot),
            unmapped: config.system.unmapped,
        })
    }

    /// The variant this system elaborated into.
    pub fn variant(&self) -> TopologyVariant {
        self.variant
    }

    /// Number of harts in the topology.
    pub fn harts(&self) -> usize {
        self.domains.len()
    }

    /// Offers a memory access from hart `hart` on the given stream.
    ///
    /// Returns `false` as backpressure; the core must hold the request.
    pub fn mem_request(&mut self, hart: usize, path: MemPath, req: BusRequest) -> bool {
        self.domains[hart].try_request(path, req)
    }

    /// Takes the completed memory response for hart `hart` on a stream.
    pub fn mem_response(&mut self, hart: usize, path: MemPath) -> Option<BusResponse> {
        self.domains[hart].take_response(path)
    }

    /// Offers an MMIO access from hart `hart`.
    ///
    /// The address is decoded over the static partition; exactly one
    /// transaction per hart may be outstanding.
    pub fn mmio_request(&mut self, hart: usize, req: BusRequest) -> bool {
        if self.mmio[hart].target.is_some() || self.mmio[hart].response.is_some() {
            return false;
        }
        let region = self.mmio_map.decode(req.addr).map(|idx| self.mmio_tags[idx]);
        let target = match region {
            Some(MmioRegion::External) => {
                if !self.ext_mmio.try_request(hart, req) {
                    return false;
                }
                MmioTarget::External
            }
            Some(tag) => {
                self.mmio[hart].queued = Some(req);
                MmioTarget::Device(tag)
            }
            None => match self.unmapped {
                UnmappedPolicy::Permissive => MmioTarget::Unmapped,
                UnmappedPolicy::CatchAll => {
                    if !self.ext_mmio.try_request(hart, req) {
                        return false;
                    }
                    MmioTarget::External
                }
            },
        };
        self.mmio[hart].target = Some(target);
        true
    }

    /// Takes the completed MMIO response for hart `hart`, if ready.
    pub fn mmio_response(&mut self, hart: usize) -> Option<BusResponse> {
        match self.mmio[hart].target? {
            MmioTarget::External => {
                let resp = self.ext_mmio.take_response(hart)?;
                self.mmio[hart].target = None;
                Some(resp)
            }
            MmioTarget::Device(_) | MmioTarget::Unmapped => {
                let resp = self.mmio[hart].response.take()?;
                self.mmio[hart].target = None;
                Some(resp)
            }
        }
    }

    /// Registered interrupt lines currently presented to hart `hart`.
    pub fn irq(&self, hart: usize) -> IrqLines {
        IrqLines {
            timer: self.timers[hart].timer_irq(0),
            software: self.timers[hart].software_irq(0),
            external: self.plic.external_irq(hart),
        }
    }

    /// Drives the raw external interrupt request vector.
    pub fn set_external_irqs(&mut self, vector: u32) {
        self.plic.set_inputs(vector);
    }

    /// Reports hart `hart` idle for the timer fast-forward hook.
    pub fn set_idle(&mut self, hart: usize, idle: bool) {
        self.timers[hart].set_idle(idle);
    }

    /// Direct access to hart `hart`'s timer instance (diagnostics/tests).
    pub fn timer(&self, hart: usize) -> &MachineTimer {
        &self.timers[hart]
    }

    /// Advances the whole system by one clock.
    pub fn tick(&mut self) {
        // Queued MMIO device accesses land first, so a register write is
        // visible to this cycle's device update.
        for hart in 0..self.mmio.len() {
            self.perform_mmio(hart);
        }
        for timer in &mut self.timers {
            timer.tick();
        }
        self.plic.tick();
        self.ext_mmio.tick();

        // Memory path: ferry probes, pump the domains, clock the fabric.
        self.ferry_probes();
        for (domain, merge) in self.domains.iter_mut().zip(self.merges.iter_mut()) {
            domain.pump(merge);
        }
        for merge in &mut self.merges {
            merge.tick();
        }
        if let Some(bc) = &self.broadcaster {
            bc.borrow_mut().tick();
        }
    }

    /// Performs the queued MMIO device access for one hart, if any.
    fn perform_mmio(&mut self, hart: usize) {
        let Some(target) = self.mmio[hart].target else {
            return;
        };
        match target {
            MmioTarget::Unmapped => {
                if self.mmio[hart].response.is_none() {
                    self.mmio[hart].response = Some(BusResponse::ZERO);
                }
            }
            MmioTarget::Device(region) => {
                let Some(req) = self.mmio[hart].queued.take() else {
                    return;
                };
                let base = self.mmio_base(region);
                let offset = req.addr - base;
                let (lo_mask, hi_mask) = req.mask.split_words();
                let resp = match req.kind {
                    AccessKind::Read => {
                        let lo = u64::from(self.device_read(hart, region, offset));
                        let hi = if hi_mask != 0 {
                            u64::from(self.device_read(hart, region, offset + 4))
                        } else {
                            0
                        };
                        BusResponse::okay(lo | (hi << 32))
                    }
                    AccessKind::Write => {
                        if lo_mask != 0 {
                            self.device_write(hart, region, offset, req.data as u32, lo_mask);
                        }
                        if hi_mask != 0 {
                            self.device_write(
                                hart,
                                region,
                                offset + 4,
                                (req.data >> 32) as u32,
                                hi_mask,
                            );
                        }
                        BusResponse::okay(0)
                    }
                };
                self.mmio[hart].response = Some(resp);
            }
            MmioTarget::External => {}
        }
    }

    fn mmio_base(&self, wanted: MmioRegion) -> u64 {
        self.mmio_tags
            .iter()
            .position(|tag| *tag == wanted)
            .map_or(0, |idx| self.mmio_map.range(idx).base)
    }

    fn device_read(&mut self, hart: usize, region: MmioRegion, offset: u64) -> u32 {
        match region {
            MmioRegion::Timer => self.timers[hart].read_word(offset),
            MmioRegion::Plic => self.plic.read_word(offset),
            MmioRegion::External => 0,
        }
    }

    fn device_write(&mut self, hart: usize, region: MmioRegion, offset: u64, value: u32, mask: u8) {
        match region {
            MmioRegion::Timer => self.timers[hart].write_word(offset, value, mask),
            MmioRegion::Plic => self.plic.write_word(offset, value, mask),
            MmioRegion::External => {}
        }
    }

    /// Delivers the broadcaster's outstanding probe to its target domain
    /// and reports the acknowledge back; a deferred probe is retried every
    /// cycle until the target's conflicting access drains.
    ///
    /// Delivery is held while the exclusive holder's own access to the
    /// line is still outstanding: that access was serialized ahead of the
    /// probe, so it must finish (and the broadcaster forwards it ahead of
    /// everything else) before the invalidate or downgrade lands.
    fn ferry_probes(&mut self) {
        use crate::coherence::LineState;
        let Some(bc) = &self.broadcaster else {
            return;
        };
        let Some(op) = bc.borrow().pending_probe() else {
            return;
        };
        let holder = bc.borrow().holder_state(op.line, op.target);
        if holder == LineState::Exclusive
            && self.domains[op.target].data_access_outstanding(op.line)
        {
            return;
        }
        if self.domains[op.target].probe(op.line, op.kind) == ProbeResponse::Ack {
            bc.borrow_mut().probe_acked();
        }
    }

    /// Directory/domain agreement check used by the randomized coherence
    /// tests: at most one hart holds a writable copy of `addr`'s line.
    pub fn exclusivity_holds(&self, addr: u64) -> bool {
        use crate::coherence::LineState;
        let line = line_of(addr);
        let writers = self
            .domains
            .iter()
            .filter(|d| d.line_state(line) == LineState::Exclusive)
            .count();
        writers <= 1
    }
}
