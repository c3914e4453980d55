//! 68HC11 timer event sources.
//!
//! Each source owns one flag bit (TFLG1/TFLG2), one mask bit
//! (TMSK1/TMSK2) and one data register. Foreground code drives a
//! [`Source`] through the [`EventSource`] trait; interrupt handlers use
//! [`SourceId::acknowledge`], which returns an [`Ack`] token that must be
//! consumed to publish anything to the foreground. The handler sequence
//! is thus fixed: latch data, clear flag, optionally disable, publish.

use core::fmt;

use common::sync::{IrqGuard, Posted, Producer};

use super::regs::{self, Cforc, Timer1, Timer2};
use super::vectors::Vector;
use crate::hal::Device;
use crate::hal::interrupt::IsrFrame;
use crate::hal::register::{FlagReg, Reg8, Reg16, RegisterBus};
use crate::hal::timer::{Delivery, EventSource, ForcedEvent, LatchedEvent, SourceState};
use crate::hal::wait::{self, Backoff, Ticks, WaitError};

/// Identity of a timer event generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    Oc1,
    Oc2,
    Oc3,
    Oc4,
    /// Requires PACTL I4/O5 clear.
    Oc5,
    Ic1,
    Ic2,
    Ic3,
    /// Requires PACTL I4/O5 set.
    Ic4,
    /// Pulse accumulator input edge (PAIF).
    PulseEdge,
    /// Pulse accumulator rollover (PAOVF).
    PulseOverflow,
    /// Free-running counter rollover (TOF).
    TimerOverflow,
    /// Real-time interrupt (RTIF).
    RealTime,
}

/// Register holding the value associated with a source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataReg {
    Word(Reg16),
    Byte(Reg8),
}

impl SourceId {
    pub const ALL: [SourceId; 13] = [
        SourceId::Oc1,
        SourceId::Oc2,
        SourceId::Oc3,
        SourceId::Oc4,
        SourceId::Oc5,
        SourceId::Ic1,
        SourceId::Ic2,
        SourceId::Ic3,
        SourceId::Ic4,
        SourceId::PulseEdge,
        SourceId::PulseOverflow,
        SourceId::TimerOverflow,
        SourceId::RealTime,
    ];

    pub const fn flag_reg(self) -> FlagReg {
        match self {
            SourceId::PulseEdge
            | SourceId::PulseOverflow
            | SourceId::TimerOverflow
            | SourceId::RealTime => regs::TFLG2,
            _ => regs::TFLG1,
        }
    }

    pub const fn mask_reg(self) -> Reg8 {
        match self.flag_reg() {
            regs::TFLG2 => regs::TMSK2,
            _ => regs::TMSK1,
        }
    }

    /// Flag bit, which is also the mask bit.
    pub const fn bit(self) -> u8 {
        match self {
            SourceId::Oc1 => Timer1::OC1.bits(),
            SourceId::Oc2 => Timer1::OC2.bits(),
            SourceId::Oc3 => Timer1::OC3.bits(),
            SourceId::Oc4 => Timer1::OC4.bits(),
            SourceId::Oc5 | SourceId::Ic4 => Timer1::I4O5.bits(),
            SourceId::Ic1 => Timer1::IC1.bits(),
            SourceId::Ic2 => Timer1::IC2.bits(),
            SourceId::Ic3 => Timer1::IC3.bits(),
            SourceId::PulseEdge => Timer2::PAI.bits(),
            SourceId::PulseOverflow => Timer2::PAOV.bits(),
            SourceId::TimerOverflow => Timer2::TO.bits(),
            SourceId::RealTime => Timer2::RTI.bits(),
        }
    }

    /// Counter snapshot, capture value, compare target or pulse count.
    pub const fn data(self) -> DataReg {
        match self {
            SourceId::Oc1 => DataReg::Word(regs::TOC1),
            SourceId::Oc2 => DataReg::Word(regs::TOC2),
            SourceId::Oc3 => DataReg::Word(regs::TOC3),
            SourceId::Oc4 => DataReg::Word(regs::TOC4),
            SourceId::Oc5 => DataReg::Word(regs::TOC5),
            SourceId::Ic1 => DataReg::Word(regs::TIC1),
            SourceId::Ic2 => DataReg::Word(regs::TIC2),
            SourceId::Ic3 => DataReg::Word(regs::TIC3),
            SourceId::Ic4 => DataReg::Word(regs::TIC4),
            SourceId::PulseEdge | SourceId::PulseOverflow => DataReg::Byte(regs::PACNT),
            SourceId::TimerOverflow | SourceId::RealTime => DataReg::Word(regs::TCNT),
        }
    }

    pub const fn vector(self) -> Vector {
        match self {
            SourceId::Oc1 => Vector::Oc1,
            SourceId::Oc2 => Vector::Oc2,
            SourceId::Oc3 => Vector::Oc3,
            SourceId::Oc4 => Vector::Oc4,
            SourceId::Oc5 | SourceId::Ic4 => Vector::Oc5Ic4,
            SourceId::Ic1 => Vector::Ic1,
            SourceId::Ic2 => Vector::Ic2,
            SourceId::Ic3 => Vector::Ic3,
            SourceId::PulseEdge => Vector::PulseEdge,
            SourceId::PulseOverflow => Vector::PulseOverflow,
            SourceId::TimerOverflow => Vector::TimerOverflow,
            SourceId::RealTime => Vector::RealTime,
        }
    }

    /// CFORC bit, for output compares.
    pub const fn force_bit(self) -> Option<u8> {
        match self {
            SourceId::Oc1 => Some(Cforc::FOC1.bits()),
            SourceId::Oc2 => Some(Cforc::FOC2.bits()),
            SourceId::Oc3 => Some(Cforc::FOC3.bits()),
            SourceId::Oc4 => Some(Cforc::FOC4.bits()),
            SourceId::Oc5 => Some(Cforc::FOC5.bits()),
            _ => None,
        }
    }

    /// Compare register, for output compares.
    pub const fn compare_reg(self) -> Option<Reg16> {
        match (self.force_bit(), self.data()) {
            (Some(_), DataReg::Word(reg)) => Some(reg),
            _ => None,
        }
    }

    /// Read the data register.
    pub fn read_data<B: RegisterBus + ?Sized>(self, bus: &mut B) -> u16 {
        match self.data() {
            DataReg::Word(reg) => bus.read16(reg),
            DataReg::Byte(reg) => u16::from(bus.read8(reg)),
        }
    }

    /// Move the compare target `delta` ticks past its current value.
    ///
    /// Returns the new target, or `None` for sources without a compare
    /// register.
    pub fn advance_compare<B: RegisterBus + ?Sized>(self, bus: &mut B, delta: u16) -> Option<u16> {
        let reg = self.compare_reg()?;
        let target = bus.read16(reg).wrapping_add(delta);
        bus.write16(reg, target);
        Some(target)
    }

    /// Handler-side acknowledgement.
    ///
    /// Reads the data register, clears the flag and, for
    /// [`Rearm::OneShot`], clears the source's own mask bit. The returned
    /// token is the only way to publish the event.
    pub fn acknowledge(self, frame: &mut IsrFrame<'_>, rearm: Rearm) -> Ack {
        let bus = frame.bus();
        let data = self.read_data(bus);
        bus.clear_flags(self.flag_reg(), self.bit());
        if rearm == Rearm::OneShot {
            bus.modify8(self.mask_reg(), self.bit(), 0);
        }
        Ack { source: self, data }
    }
}

/// What a handler does with its own interrupt after acknowledging.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rearm {
    /// Leave the mask bit set; the next event interrupts again.
    Repeat,
    /// Clear the mask bit; later events only latch the flag.
    OneShot,
}

/// Proof that a handler has latched data and cleared its flag.
#[must_use = "an acknowledged event is only visible once published"]
#[derive(Debug)]
pub struct Ack {
    source: SourceId,
    data: u16,
}

impl Ack {
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Data register value read before the flag was cleared.
    pub fn data(&self) -> u16 {
        self.data
    }

    /// Hand `value` to the foreground. This is the handler's last step.
    pub fn publish<T>(self, tx: &mut Producer<T>, value: T) -> Posted {
        tx.post(value)
    }

    /// Publish the latched data itself.
    pub fn publish_data(self, tx: &mut Producer<u16>) -> Posted {
        let data = self.data;
        self.publish(tx, data)
    }
}

/// Event source errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No event within the wait budget.
    Timeout { waited: Ticks },
    /// The source has no CFORC bit.
    NotForceable(SourceId),
    /// The source has no compare register.
    NotCompare(SourceId),
}

impl From<WaitError> for SourceError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout { waited } => SourceError::Timeout { waited },
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Timeout { waited } => write!(f, "no event after {} ticks", waited.0),
            SourceError::NotForceable(id) => write!(f, "{:?} cannot be forced", id),
            SourceError::NotCompare(id) => write!(f, "{:?} has no compare register", id),
        }
    }
}

/// Foreground view of one event source.
#[derive(Debug)]
pub struct Source {
    id: SourceId,
    state: SourceState,
    delivery: Delivery,
    latched: Option<u16>,
}

impl Source {
    pub const fn new(id: SourceId) -> Self {
        Self {
            id,
            state: SourceState::Idle,
            delivery: Delivery::Polled,
            latched: None,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Data register value read with the last observed flag.
    pub fn latched(&self) -> Option<u16> {
        self.latched
    }

    /// Set the compare target to `delta` ticks from now.
    pub fn compare_in<D: Device + ?Sized>(&mut self, dev: &mut D, delta: u16) -> Result<u16, SourceError> {
        let reg = self.id.compare_reg().ok_or(SourceError::NotCompare(self.id))?;
        let target = dev.read16(regs::TCNT).wrapping_add(delta);
        dev.write16(reg, target);
        Ok(target)
    }

    /// Move the compare target `delta` ticks past the previous one.
    pub fn compare_next<D: Device + ?Sized>(&mut self, dev: &mut D, delta: u16) -> Result<u16, SourceError> {
        let mut cs = IrqGuard::new(dev);
        self.id
            .advance_compare(&mut *cs, delta)
            .ok_or(SourceError::NotCompare(self.id))
    }
}

impl<D: Device + ?Sized> EventSource<D> for Source {
    type Error = SourceError;

    fn arm(&mut self, dev: &mut D) -> Result<(), Self::Error> {
        let id = self.id;
        let mut cs = IrqGuard::new(dev);
        cs.clear_flags(id.flag_reg(), id.bit());
        cs.modify8(id.mask_reg(), 0, id.bit());
        self.state = SourceState::Armed;
        self.delivery = Delivery::Interrupt;
        log::debug!("{:?} armed for interrupts", id);
        Ok(())
    }

    fn arm_polled(&mut self, dev: &mut D) -> Result<(), Self::Error> {
        let id = self.id;
        let mut cs = IrqGuard::new(dev);
        cs.modify8(id.mask_reg(), id.bit(), 0);
        cs.clear_flags(id.flag_reg(), id.bit());
        self.state = SourceState::Armed;
        self.delivery = Delivery::Polled;
        log::debug!("{:?} armed for polling", id);
        Ok(())
    }

    fn poll_fired(&mut self, dev: &mut D) -> Result<bool, Self::Error> {
        let id = self.id;
        let mut cs = IrqGuard::new(dev);
        if cs.read_flags(id.flag_reg()) & id.bit() == 0 {
            return Ok(false);
        }
        let data = id.read_data(&mut *cs);
        cs.clear_flags(id.flag_reg(), id.bit());
        drop(cs);

        self.latched = Some(data);
        self.state = SourceState::Fired;
        log::trace!("{:?} fired, data {:#06x}", id, data);
        Ok(true)
    }

    fn wait_fired(
        &mut self,
        dev: &mut D,
        timeout: Ticks,
        backoff: &mut dyn Backoff,
    ) -> Result<(), Self::Error> {
        wait::until(
            dev,
            timeout,
            backoff,
            |d| d.read16(regs::TCNT),
            |d| match self.poll_fired(d) {
                Ok(false) => None,
                fired => Some(fired.map(|_| ())),
            },
        )
        .map_err(SourceError::from)?
    }

    fn clear(&mut self, dev: &mut D) -> Result<(), Self::Error> {
        dev.clear_flags(self.id.flag_reg(), self.id.bit());
        if self.state == SourceState::Fired {
            self.state = SourceState::Armed;
        }
        Ok(())
    }

    fn disarm(&mut self, dev: &mut D) -> Result<(), Self::Error> {
        let id = self.id;
        let mut cs = IrqGuard::new(dev);
        cs.modify8(id.mask_reg(), id.bit(), 0);
        self.delivery = Delivery::Polled;
        Ok(())
    }

    fn state(&self) -> SourceState {
        self.state
    }
}

impl<D: Device + ?Sized> ForcedEvent<D> for Source {
    fn force(&mut self, dev: &mut D) -> Result<(), SourceError> {
        let bit = self.id.force_bit().ok_or(SourceError::NotForceable(self.id))?;
        // FOC5 does nothing while the shared channel is IC4
        if self.id == SourceId::Oc5 && dev.read8(regs::PACTL) & regs::Pactl::I4O5.bits() != 0 {
            return Err(SourceError::NotForceable(self.id));
        }
        dev.write8(regs::CFORC, bit);
        log::debug!("{:?} forced", self.id);
        Ok(())
    }
}

impl<D: Device + ?Sized> LatchedEvent<D> for Source {
    fn latched(&self) -> Option<u16> {
        self.latched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_follow_flag_group() {
        assert_eq!(SourceId::Oc3.flag_reg(), regs::TFLG1);
        assert_eq!(SourceId::Oc3.mask_reg(), regs::TMSK1);
        assert_eq!(SourceId::RealTime.flag_reg(), regs::TFLG2);
        assert_eq!(SourceId::RealTime.mask_reg(), regs::TMSK2);
        assert_eq!(SourceId::Oc5.bit(), SourceId::Ic4.bit());
        assert_eq!(SourceId::Ic4.vector(), Vector::Oc5Ic4);
    }

    #[test]
    fn only_output_compares_are_forceable() {
        assert_eq!(SourceId::Oc1.force_bit(), Some(0x80));
        assert_eq!(SourceId::Oc5.compare_reg(), Some(regs::TOC5));
        assert_eq!(SourceId::Ic4.compare_reg(), None);
        assert_eq!(SourceId::TimerOverflow.force_bit(), None);
    }
}

#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::hal::gpio::PinLevel;
    use crate::hal::interrupt::install;
    use crate::hal::wait::Spin;
    use crate::platform::sim::{Pin, SimDevice, Stimulus};
    use common::sync::{IrqControl, Overflow, channel};

    #[test]
    fn armed_source_without_event_has_not_fired() {
        for id in SourceId::ALL {
            let mut dev = SimDevice::new();
            if id == SourceId::Ic4 {
                dev.write8(regs::PACTL, regs::Pactl::I4O5.bits());
            }
            let mut src = Source::new(id);
            src.arm(&mut dev).unwrap();
            assert!(!src.poll_fired(&mut dev).unwrap(), "{:?}", id);
            assert_eq!(src.state(), SourceState::Armed);
        }
    }

    #[test]
    fn forced_compare_fires_exactly_once() {
        let mut dev = SimDevice::new();
        let mut oc3 = Source::new(SourceId::Oc3);
        oc3.arm_polled(&mut dev).unwrap();
        oc3.force(&mut dev).unwrap();
        assert!(oc3.poll_fired(&mut dev).unwrap());
        assert_eq!(oc3.latched(), Some(0xFFFF));
        assert!(!oc3.poll_fired(&mut dev).unwrap());

        assert_eq!(
            Source::new(SourceId::Ic2).force(&mut dev),
            Err(SourceError::NotForceable(SourceId::Ic2))
        );
    }

    #[test]
    fn oc5_cannot_be_forced_while_ic4_is_selected() {
        let mut dev = SimDevice::new();
        dev.write8(regs::PACTL, regs::Pactl::I4O5.bits());
        let mut oc5 = Source::new(SourceId::Oc5);
        oc5.arm_polled(&mut dev).unwrap();
        assert_eq!(oc5.force(&mut dev), Err(SourceError::NotForceable(SourceId::Oc5)));
        assert!(!oc5.poll_fired(&mut dev).unwrap());

        dev.write8(regs::PACTL, 0);
        oc5.force(&mut dev).unwrap();
        assert!(oc5.poll_fired(&mut dev).unwrap());
    }

    #[test]
    fn clearing_twice_is_clearing_once() {
        let mut dev = SimDevice::new();
        dev.run(9000);
        let mut rti = Source::new(SourceId::RealTime);
        rti.clear(&mut dev).unwrap();
        let once = dev.read_flags(regs::TFLG2);
        rti.clear(&mut dev).unwrap();
        assert_eq!(dev.read_flags(regs::TFLG2), once);
        assert_eq!(once & Timer2::RTI.bits(), 0);
    }

    #[test]
    fn capture_reports_the_latched_counter() {
        let stimulus = Stimulus::new().at(1000, Pin::A(0), PinLevel::High).unwrap();
        let mut dev = SimDevice::new().with_stimulus(stimulus);
        dev.write8(regs::TCTL2, regs::Edge::Rising.bits() << regs::tctl2_shift(3));

        let mut ic3 = Source::new(SourceId::Ic3);
        ic3.arm_polled(&mut dev).unwrap();
        ic3.wait_fired(&mut dev, Ticks(5000), &mut Spin).unwrap();
        assert_eq!(ic3.latched(), Some(1000));
        assert_eq!(dev.read16(regs::TIC3), 1000);
    }

    #[test]
    fn compare_fires_once_per_target() {
        let mut dev = SimDevice::new();
        dev.write8(regs::TCTL1, regs::OcAction::Toggle.bits() << regs::tctl1_shift(2));
        let mut oc2 = Source::new(SourceId::Oc2);
        oc2.arm_polled(&mut dev).unwrap();
        let target = oc2.compare_in(&mut dev, 2000).unwrap();

        oc2.wait_fired(&mut dev, Ticks(4000), &mut Spin).unwrap();
        assert_eq!(oc2.latched(), Some(target));
        dev.run(3000);
        assert!(!oc2.poll_fired(&mut dev).unwrap());
        assert_eq!(dev.hardware().edges().len(), 1);
    }

    #[test]
    fn wait_on_silent_source_times_out() {
        let mut dev = SimDevice::new();
        let mut ic1 = Source::new(SourceId::Ic1);
        ic1.arm_polled(&mut dev).unwrap();
        let err = ic1.wait_fired(&mut dev, Ticks(500), &mut Spin).unwrap_err();
        assert!(matches!(err, SourceError::Timeout { waited } if waited >= Ticks(500)));
    }

    #[test]
    fn one_shot_handler_runs_once() {
        let mut dev = SimDevice::new();
        let (mut tx, mut rx) = channel::<u16>(Overflow::DropNew);
        {
            let mut cs = IrqGuard::new(&mut dev);
            install(&mut cs, Vector::RealTime, move |frame| {
                SourceId::RealTime
                    .acknowledge(frame, Rearm::OneShot)
                    .publish_data(&mut tx);
            })
            .unwrap();
        }
        let mut rti = Source::new(SourceId::RealTime);
        rti.arm(&mut dev).unwrap();
        dev.enable();
        dev.run(30_000);

        assert_eq!(dev.taken(Vector::RealTime), 1);
        assert!(rx.take().is_some());
        assert!(rx.take().is_none());
        assert_eq!(dev.read8(regs::TMSK2) & Timer2::RTI.bits(), 0);
        assert_ne!(dev.read_flags(regs::TFLG2) & Timer2::RTI.bits(), 0);
    }
}
