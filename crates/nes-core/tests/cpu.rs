//! CPU tests for the NES emulator

use nes_core::cpu::{Cpu, StatusFlags, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use nes_core::memory::Memory;
use nes_core::{Component, Error};

fn setup() -> (Cpu, Memory) {
    let mut memory = Memory::new();
    memory.initialize().unwrap();
    let mut cpu = Cpu::new();
    cpu.initialize().unwrap();
    (cpu, memory)
}

#[test]
fn test_cpu_power_on() {
    let (cpu, _) = setup();

    assert_eq!(cpu.registers().a, 0);
    assert_eq!(cpu.registers().x, 0);
    assert_eq!(cpu.registers().y, 0);
    assert_eq!(cpu.registers().p.bits(), 0x06);
    assert_eq!(cpu.registers().sp, 0xFF);
    assert_eq!(cpu.registers().pc, 0);
    assert_eq!(cpu.cycles(), 0);
}

#[test]
fn test_cpu_lifecycle() {
    let mut memory = Memory::new();
    memory.initialize().unwrap();
    let mut cpu = Cpu::new();

    assert!(matches!(cpu.clear(), Err(Error::Uninitialized(Component::Cpu))));
    assert!(matches!(cpu.step(&mut memory), Err(Error::Uninitialized(Component::Cpu))));
    assert!(matches!(cpu.push(&mut memory, 1), Err(Error::Uninitialized(Component::Cpu))));

    cpu.initialize().unwrap();
    assert!(matches!(cpu.initialize(), Err(Error::AlreadyInitialized(Component::Cpu))));

    cpu.uninitialize().unwrap();
    assert!(!cpu.is_initialized());
    assert!(matches!(cpu.uninitialize(), Err(Error::Uninitialized(Component::Cpu))));
}

#[test]
fn test_cpu_clear_keeps_initialized() {
    let (mut cpu, mut memory) = setup();
    cpu.registers_mut().a = 0x42;
    cpu.registers_mut().pc = 0x1234;
    cpu.push(&mut memory, 0x99).unwrap();

    cpu.clear().unwrap();
    assert!(cpu.is_initialized());
    assert_eq!(cpu.registers().a, 0);
    assert_eq!(cpu.registers().pc, 0);
    assert_eq!(cpu.registers().sp, 0xFF);
}

#[test]
fn test_cpu_reset() {
    let (mut cpu, mut memory) = setup();
    memory.write(RESET_VECTOR as usize, &[0x00, 0xC0]).unwrap();
    cpu.registers_mut().x = 7;

    cpu.reset(&mut memory).unwrap();

    assert_eq!(cpu.registers().x, 0);
    assert_eq!(cpu.registers().sp, 0xFF);
    assert_eq!(cpu.registers().pc, 0xC000);
}

#[test]
fn test_cpu_uses_memory_it_is_given() {
    let (mut cpu, _) = setup();
    let mut uninitialized = Memory::new();
    assert!(matches!(
        cpu.reset(&mut uninitialized),
        Err(Error::Uninitialized(Component::Memory))
    ));
}

#[test]
fn test_word_byte_order() {
    let (mut cpu, mut memory) = setup();
    cpu.store_word(&mut memory, 0x0300, 0xABCD).unwrap();
    assert_eq!(memory.peek(0x0300).unwrap(), 0xCD);
    assert_eq!(memory.peek(0x0301).unwrap(), 0xAB);
    assert_eq!(cpu.load_word(&mut memory, 0x0300).unwrap(), 0xABCD);
    assert_eq!(cpu.load(&mut memory, 0x0301).unwrap(), 0xAB);
}

#[test]
fn test_stack_round_trip() {
    let (mut cpu, mut memory) = setup();

    for value in [0x00u8, 0x7F, 0x80, 0xFF] {
        cpu.push(&mut memory, value).unwrap();
        assert_eq!(cpu.registers().sp, 0xFE);
        assert_eq!(cpu.pop(&mut memory).unwrap(), value);
        assert_eq!(cpu.registers().sp, 0xFF);
    }

    cpu.push_word(&mut memory, 0x1234).unwrap();
    assert_eq!(memory.peek(0x01FF).unwrap(), 0x12);
    assert_eq!(memory.peek(0x01FE).unwrap(), 0x34);
    assert_eq!(cpu.pop_word(&mut memory).unwrap(), 0x1234);
    assert_eq!(cpu.registers().sp, 0xFF);
}

#[test]
fn test_stack_wraps_within_page() {
    let (mut cpu, mut memory) = setup();
    cpu.registers_mut().sp = 0x00;
    cpu.push(&mut memory, 0xAA).unwrap();
    assert_eq!(memory.peek(0x0100).unwrap(), 0xAA);
    assert_eq!(cpu.registers().sp, 0xFF);
    assert_eq!(cpu.pop(&mut memory).unwrap(), 0xAA);
    assert_eq!(cpu.registers().sp, 0x00);
}

#[test]
fn test_irq_masked_is_noop() {
    let (mut cpu, mut memory) = setup();
    memory.write(IRQ_VECTOR as usize, &[0x00, 0x90]).unwrap();
    cpu.registers_mut().p.set_interrupt(false);
    cpu.registers_mut().pc = 0x4000;
    let before = *cpu.registers();

    cpu.irq(&mut memory).unwrap();

    assert_eq!(*cpu.registers(), before);
    assert_eq!(cpu.cycles(), 0);
    assert_eq!(memory.peek(0x01FF).unwrap(), 0);
}

#[test]
fn test_irq_sequence() {
    let (mut cpu, mut memory) = setup();
    memory.write(IRQ_VECTOR as usize, &[0x00, 0x90]).unwrap();
    cpu.registers_mut().pc = 0x4321;
    cpu.registers_mut().p.set(StatusFlags::BREAK | StatusFlags::CARRY, true);

    cpu.irq(&mut memory).unwrap();

    assert_eq!(cpu.registers().pc, 0x9000);
    assert_eq!(cpu.cycles(), 7);
    assert_eq!(cpu.registers().sp, 0xFC);
    assert_eq!(memory.peek(0x01FF).unwrap(), 0x43);
    assert_eq!(memory.peek(0x01FE).unwrap(), 0x21);
    let pushed = StatusFlags::new(memory.peek(0x01FD).unwrap());
    assert!(!pushed.brk());
    assert!(pushed.carry());
    assert!(pushed.interrupt());
}

#[test]
fn test_nmi_ignores_mask() {
    let (mut cpu, mut memory) = setup();
    memory.write(NMI_VECTOR as usize, &[0x34, 0x12]).unwrap();
    cpu.registers_mut().p.set_interrupt(false);
    cpu.registers_mut().pc = 0x8000;

    cpu.nmi(&mut memory).unwrap();

    assert_eq!(cpu.registers().pc, 0x1234);
    assert_eq!(cpu.cycles(), 7);
    assert_eq!(cpu.pop(&mut memory).unwrap(), 0x02); // zero flag only
    assert_eq!(cpu.pop_word(&mut memory).unwrap(), 0x8000);
}

#[test]
fn test_interrupt_return_restores_state() {
    let (mut cpu, mut memory) = setup();
    memory.write(NMI_VECTOR as usize, &[0x00, 0xA0]).unwrap();
    cpu.registers_mut().pc = 0x8123;
    cpu.registers_mut().p = StatusFlags::new(0xC3);

    cpu.nmi(&mut memory).unwrap();
    cpu.registers_mut().p = StatusFlags::new(0x00);
    cpu.interrupt_return(&mut memory).unwrap();

    assert_eq!(cpu.registers().pc, 0x8123);
    assert_eq!(cpu.registers().p.bits(), 0xC3);
    assert_eq!(cpu.registers().sp, 0xFF);
}

#[test]
fn test_interrupt_return_clears_break() {
    let (mut cpu, mut memory) = setup();
    cpu.push_word(&mut memory, 0x2000).unwrap();
    cpu.push(&mut memory, 0xFF).unwrap();

    cpu.interrupt_return(&mut memory).unwrap();

    assert_eq!(cpu.registers().p.bits(), 0xFF & !StatusFlags::BREAK);
    assert_eq!(cpu.registers().pc, 0x2000);
}

#[test]
fn test_status_flags() {
    let mut flags = StatusFlags::new(0xFF);
    assert!(flags.carry());
    assert!(flags.zero());
    assert!(flags.interrupt());
    assert!(flags.overflow());
    assert!(flags.negative());

    flags.set_carry(false);
    assert!(!flags.carry());

    flags.set_overflow(true);
    assert!(flags.overflow());

    flags.set_zn(0x80);
    assert!(flags.negative());
    assert!(!flags.zero());
}
