//! Memory-mapped 68HC11 backend.
//!
//! Register accesses are single volatile byte accesses; 16-bit pairs go
//! high byte first, which is the order the timer latches expect. Handlers
//! are reached through the monitor's RAM jump table: binding a vector
//! writes `JMP stub` into its entry, and the per-vector stub calls
//! [`dispatch`], which finds the handler in a static table.

use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicU8, AtomicU16, AtomicUsize, Ordering};

use common::sync::{IrqControl, SpinLock};

use crate::hal::interrupt::{Handler, IsrFrame, VectorTable};
use crate::hal::register::{FlagReg, Reg8, Reg16, RegisterBus};
use crate::hw::hc11::vectors::JMP_OPCODE;
use crate::hw::hc11::{VECTOR_COUNT, Vector, VectorError, VectorSlot};

/// Volatile access to a register block.
#[derive(Debug)]
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must be the address of a mapped register block of at least
    /// [`BLOCK_LEN`](crate::hw::hc11::regs::BLOCK_LEN) bytes, and no other
    /// code may access it while the bus is alive.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline(always)]
    fn ptr(&self, offset: u16) -> *mut u8 {
        (self.base + usize::from(offset)) as *mut u8
    }
}

impl RegisterBus for MmioBus {
    fn read8(&mut self, reg: Reg8) -> u8 {
        // SAFETY: in bounds of the block promised to `new`
        unsafe { read_volatile(self.ptr(reg.offset())) }
    }

    fn write8(&mut self, reg: Reg8, value: u8) {
        // SAFETY: in bounds of the block promised to `new`
        unsafe { write_volatile(self.ptr(reg.offset()), value) }
    }

    fn read16(&mut self, reg: Reg16) -> u16 {
        let hi = self.read8(reg.high());
        let lo = self.read8(reg.low());
        u16::from_be_bytes([hi, lo])
    }

    fn write16(&mut self, reg: Reg16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write8(reg.high(), hi);
        self.write8(reg.low(), lo);
    }

    fn read_flags(&mut self, reg: FlagReg) -> u8 {
        self.read8(Reg8(reg.offset()))
    }

    fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
        // a plain store: the hardware only clears where a one is written
        self.write8(Reg8(reg.offset()), mask);
    }
}

/// Handlers live outside the device so a stub can reach them without a
/// reference to the foreground's [`MmioDevice`].
static HANDLERS: SpinLock<[Option<Handler>; VECTOR_COUNT]> = SpinLock::new([const { None }; VECTOR_COUNT]);

/// One bit per bound vector, readable without the table lock.
static BOUND: AtomicU16 = AtomicU16::new(0);

/// Index plus one of the first vector taken unbound, zero while none was.
static UNHANDLED: AtomicU8 = AtomicU8::new(0);

/// Register block base for [`dispatch`].
static BASE: AtomicUsize = AtomicUsize::new(0);

/// Run the handler bound to `vector`.
///
/// The handler gets its own [`MmioBus`] over the block the live
/// [`MmioDevice`] was created with. The first vector taken with no handler
/// is recorded and later ones are ignored.
///
/// # Arguments
/// - `vector`: the vector whose stub was entered
///
/// # Safety
///
/// Only the vector's entry stub may call this, with interrupts masked and
/// after an [`MmioDevice`] has been created. It must not be re-entered.
pub unsafe fn dispatch(vector: Vector) {
    if UNHANDLED.load(Ordering::Acquire) != 0 {
        return;
    }
    // bind holds the lock only with interrupts masked
    let Some(mut handlers) = HANDLERS.try_lock() else {
        log::warn!("{:?} taken while the handler table is busy", vector);
        return;
    };
    let Some(handler) = handlers[vector.index()].as_mut() else {
        log::warn!("unhandled interrupt {:?}, dispatching stopped", vector);
        UNHANDLED.store(vector.index() as u8 + 1, Ordering::Release);
        return;
    };
    // SAFETY: BASE was set by `MmioDevice::new` under the same contract
    let mut bus = unsafe { MmioBus::new(BASE.load(Ordering::Acquire)) };
    handler(&mut IsrFrame::new(&mut bus));
}

/// Real part: register block, CPU interrupt mask and RAM jump table.
pub struct MmioDevice<C: IrqControl> {
    bus: MmioBus,
    cpu: C,
    /// Host address of target address 0, where the jump table lives.
    ram: usize,
    /// Entry stub for each vector, in jump-table order.
    stubs: &'static [u16; VECTOR_COUNT],
}

impl<C: IrqControl> MmioDevice<C> {
    /// Take over the part and start with an empty handler table.
    ///
    /// # Safety
    ///
    /// At most one device may exist at a time. `ram` must map target RAM
    /// from address 0 through the end of the jump table, writable, and
    /// each stub must call [`dispatch`] with its own vector.
    pub unsafe fn new(bus: MmioBus, cpu: C, ram: usize, stubs: &'static [u16; VECTOR_COUNT]) -> Self {
        HANDLERS.lock().iter_mut().for_each(|slot| *slot = None);
        BOUND.store(0, Ordering::Release);
        UNHANDLED.store(0, Ordering::Release);
        BASE.store(bus.base, Ordering::Release);
        Self { bus, cpu, ram, stubs }
    }

    fn write_ram(&mut self, addr: u16, value: u8) {
        // SAFETY: jump-table addresses lie inside the region promised to `new`
        unsafe { write_volatile((self.ram + usize::from(addr)) as *mut u8, value) }
    }
}

impl<C: IrqControl> RegisterBus for MmioDevice<C> {
    fn read8(&mut self, reg: Reg8) -> u8 {
        self.bus.read8(reg)
    }

    fn write8(&mut self, reg: Reg8, value: u8) {
        self.bus.write8(reg, value)
    }

    fn read16(&mut self, reg: Reg16) -> u16 {
        self.bus.read16(reg)
    }

    fn write16(&mut self, reg: Reg16, value: u16) {
        self.bus.write16(reg, value)
    }

    fn read_flags(&mut self, reg: FlagReg) -> u8 {
        self.bus.read_flags(reg)
    }

    fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
        self.bus.clear_flags(reg, mask)
    }
}

impl<C: IrqControl> IrqControl for MmioDevice<C> {
    type State = C::State;

    fn disable(&mut self) -> C::State {
        self.cpu.disable()
    }

    fn restore(&mut self, state: C::State) {
        self.cpu.restore(state)
    }

    fn enable(&mut self) {
        self.cpu.enable()
    }

    fn enabled(&self) -> bool {
        self.cpu.enabled()
    }
}

impl<C: IrqControl> VectorTable for MmioDevice<C> {
    type Vector = Vector;
    type Error = VectorError;

    unsafe fn bind(&mut self, vector: Vector, handler: Handler) -> Result<(), VectorError> {
        let mut handlers = HANDLERS.lock();
        let slot = &mut handlers[vector.index()];
        if slot.is_some() {
            return Err(VectorError::Occupied(vector));
        }
        *slot = Some(handler);
        BOUND.fetch_or(1 << vector.index(), Ordering::AcqRel);
        drop(handlers);

        let slot = VectorSlot::of(vector);
        let [hi, lo] = self.stubs[vector.index()].to_be_bytes();
        self.write_ram(slot.jump, JMP_OPCODE);
        self.write_ram(slot.cell, hi);
        self.write_ram(slot.cell + 1, lo);
        log::debug!("{:?} -> stub {:#06x} at {:#06x}", vector, self.stubs[vector.index()], slot.cell);
        Ok(())
    }

    fn is_bound(&self, vector: Vector) -> bool {
        BOUND.load(Ordering::Acquire) & (1 << vector.index()) != 0
    }

    fn unhandled(&self) -> Option<Vector> {
        match UNHANDLED.load(Ordering::Acquire) {
            0 => None,
            n => Vector::ALL.get(usize::from(n) - 1).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::interrupt::install;
    use crate::hw::hc11::regs::{self, BLOCK_LEN};
    use crate::hw::hc11::vectors::JUMP_TABLE;
    use common::sync::IrqGuard;

    static STUBS: [u16; VECTOR_COUNT] = {
        let mut stubs = [0; VECTOR_COUNT];
        let mut i = 0;
        while i < VECTOR_COUNT {
            stubs[i] = 0xE000 + 8 * i as u16;
            i += 1;
        }
        stubs
    };

    #[derive(Default)]
    struct Cpu {
        masked: bool,
    }

    impl IrqControl for Cpu {
        type State = bool;

        fn disable(&mut self) -> bool {
            let was_masked = self.masked;
            self.masked = true;
            was_masked
        }

        fn restore(&mut self, was_masked: bool) {
            self.masked = was_masked;
        }

        fn enable(&mut self) {
            self.masked = false;
        }

        fn enabled(&self) -> bool {
            !self.masked
        }
    }

    #[test]
    fn word_access_is_big_endian() {
        let mut block = [0u8; BLOCK_LEN];
        let mut bus = unsafe { MmioBus::new(block.as_mut_ptr() as usize) };
        bus.write16(regs::TOC2, 0x1234);
        assert_eq!(bus.read8(regs::TOC2.high()), 0x12);
        assert_eq!(bus.read16(regs::TOC2), 0x1234);
        drop(bus);
        assert_eq!(block[0x18..0x1A], [0x12, 0x34]);
    }

    #[test]
    fn bind_writes_jump_entry_and_dispatch_runs_handler_until_unhandled() {
        let mut block = [0u8; BLOCK_LEN];
        let mut ram = [0u8; 0x100];
        let bus = unsafe { MmioBus::new(block.as_mut_ptr() as usize) };
        let mut dev = unsafe { MmioDevice::new(bus, Cpu::default(), ram.as_mut_ptr() as usize, &STUBS) };

        {
            let mut cs = IrqGuard::new(&mut dev);
            install(&mut cs, Vector::Oc1, |frame| frame.bus().write8(regs::PORTB, 0xA5)).unwrap();
            assert_eq!(
                install(&mut cs, Vector::Oc1, |_| {}),
                Err(VectorError::Occupied(Vector::Oc1))
            );
        }
        assert!(dev.enabled());

        assert!(dev.is_bound(Vector::Oc1));
        assert!(!dev.is_bound(Vector::Ic1));

        // SAFETY: stands in for the stubs, nothing else is running
        unsafe { dispatch(Vector::Oc1) };
        assert_eq!(dev.read8(regs::PORTB), 0xA5);
        unsafe { dispatch(Vector::Ic1) };
        assert_eq!(dev.unhandled(), Some(Vector::Ic1));

        // dispatching stays stopped after the first unhandled vector
        dev.write8(regs::PORTB, 0);
        unsafe { dispatch(Vector::Oc1) };
        assert_eq!(dev.read8(regs::PORTB), 0);
        drop(dev);

        let entry = usize::from(JUMP_TABLE) + 3 * Vector::Oc1.index();
        let stub = STUBS[Vector::Oc1.index()].to_be_bytes();
        assert_eq!(ram[entry..entry + 3], [JMP_OPCODE, stub[0], stub[1]]);

        let bus = unsafe { MmioBus::new(block.as_mut_ptr() as usize) };
        let dev = unsafe { MmioDevice::new(bus, Cpu::default(), ram.as_mut_ptr() as usize, &STUBS) };
        assert!(!dev.is_bound(Vector::Oc1));
        assert_eq!(dev.unhandled(), None);
    }
}
