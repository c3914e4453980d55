use core::ops::{Deref, DerefMut};

use super::irq::IrqControl;

/// Scoped critical section over a device.
///
/// - Disables interrupts on creation
/// - Dereferences to the device while held
/// - Restores the saved interrupt state on drop
///
/// Guards nest: a guard taken through another guard saves "disabled" and
/// restores "disabled", so only the outermost drop can reopen the gate.
/// While a guard is alive the device is mutably borrowed, so the gate
/// cannot be opened behind its back.
pub struct IrqGuard<'a, D: IrqControl + ?Sized> {
    dev: &'a mut D,
    irq_state: D::State,
}

impl<'a, D: IrqControl + ?Sized> IrqGuard<'a, D> {
    /// Enter a critical section on `dev`.
    pub fn new(dev: &'a mut D) -> Self {
        let irq_state = dev.disable();
        Self { dev, irq_state }
    }

    /// Enter a nested critical section.
    pub fn nest(&mut self) -> IrqGuard<'_, D> {
        IrqGuard::new(&mut *self.dev)
    }

    /// Interrupt state that will be restored on drop.
    pub fn saved(&self) -> D::State {
        self.irq_state
    }
}

impl<D: IrqControl + ?Sized> Deref for IrqGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &Self::Target {
        &*self.dev
    }
}

impl<D: IrqControl + ?Sized> DerefMut for IrqGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.dev
    }
}

impl<D: IrqControl + ?Sized> Drop for IrqGuard<'_, D> {
    fn drop(&mut self) {
        self.dev.restore(self.irq_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Cpu {
        masked: bool,
        transitions: u32,
    }

    impl IrqControl for Cpu {
        type State = bool;

        fn disable(&mut self) -> bool {
            let was_enabled = !self.masked;
            if was_enabled {
                self.transitions += 1;
            }
            self.masked = true;
            was_enabled
        }

        fn restore(&mut self, prev_enabled: bool) {
            if prev_enabled {
                self.masked = false;
                self.transitions += 1;
            }
        }

        fn enable(&mut self) {
            self.masked = false;
        }

        fn enabled(&self) -> bool {
            !self.masked
        }
    }

    #[test]
    fn guard_restores_open_gate() {
        let mut cpu = Cpu::default();
        {
            let guard = IrqGuard::new(&mut cpu);
            assert!(!guard.enabled());
            assert!(guard.saved());
        }
        assert!(cpu.enabled());
        assert_eq!(cpu.transitions, 2);
    }

    #[test]
    fn guard_keeps_closed_gate_closed() {
        let mut cpu = Cpu {
            masked: true,
            ..Cpu::default()
        };
        drop(IrqGuard::new(&mut cpu));
        assert!(!cpu.enabled());
        assert_eq!(cpu.transitions, 0);
    }

    #[test]
    fn nested_guard_does_not_reopen_early() {
        let mut cpu = Cpu::default();
        let mut outer = IrqGuard::new(&mut cpu);
        {
            let inner = outer.nest();
            assert!(!inner.saved());
        }
        assert!(!outer.enabled());
        drop(outer);
        assert!(cpu.enabled());
    }
}
