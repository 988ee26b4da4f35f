// Licensed under the Apache-2.0 license

//! Simulated open-drain bus with one scripted target, for unit tests.
//!
//! The target decodes START/STOP and bytes from the line edges the engine
//! produces, answers on SDA the way a real device would, and logs every bus
//! event. Lines, delay and clock share one state so stretching and stuck
//! lines can be scripted against simulated time.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use crate::i2c::algo_bit::BitAdapter;
use crate::i2c::common::BitAlgoConfig;
use crate::i2c::traits::{BitLines, Timebase};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    Address { byte: u8, ack: bool },
    Write { byte: u8, ack: bool },
    /// Target started shifting out `byte`.
    Read { byte: u8 },
    /// Acknowledge bit sampled from the master after a read byte.
    MasterAck(bool),
}

#[derive(Clone, Debug, Default)]
pub struct Target {
    pub addr: u16,
    pub ten_bit: bool,
    /// NAK this many address bytes before answering.
    pub nak_addresses: u32,
    /// Index of the written data byte to NAK.
    pub nak_write_at: Option<usize>,
    pub rx: Vec<u8>,
    pub tx: VecDeque<u8>,
    /// Queue every received data byte for reading back.
    pub loopback: bool,
}

impl Target {
    pub fn seven_bit(addr: u16) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    pub fn ten_bit(addr: u16) -> Self {
        Self {
            addr,
            ten_bit: true,
            ..Self::default()
        }
    }

    pub fn responding(mut self, bytes: &[u8]) -> Self {
        self.tx.extend(bytes.iter().copied());
        self
    }

    pub fn nak_addresses(mut self, count: u32) -> Self {
        self.nak_addresses = count;
        self
    }

    pub fn nak_write_at(mut self, index: usize) -> Self {
        self.nak_write_at = Some(index);
        self
    }

    pub fn loopback(mut self) -> Self {
        self.loopback = true;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    RecvByte,
    AckOut,
    SendByte,
    AckIn,
    Ignore,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum After {
    Recv,
    Send,
    Ignore,
}

struct State {
    m_sda: bool,
    m_scl: bool,
    s_sda: bool,
    phase: Phase,
    after_ack: After,
    shift: u8,
    bits: u8,
    current: u8,
    expect_address: bool,
    expect_ten_low: bool,
    ten_matched: bool,
    read: bool,
    master_acked: bool,
    target: Target,
    events: Vec<Event>,
    now: u64,
    stretch: u64,
    scl_hold_until: u64,
    stuck_sda_pulses: u32,
    scl_sense: bool,
    scl_pulses: u32,
    yields: u32,
    delayed_ns: u64,
}

impl State {
    fn sda_level(&self) -> bool {
        self.m_sda && self.s_sda && self.stuck_sda_pulses == 0
    }

    fn scl_level(&self) -> bool {
        self.m_scl && self.now >= self.scl_hold_until
    }

    fn set_sda(&mut self, high: bool) {
        let before = self.sda_level();
        self.m_sda = high;
        let after = self.sda_level();
        if self.m_scl && before != after {
            if after {
                self.on_stop();
            } else {
                self.on_start();
            }
        }
    }

    fn set_scl(&mut self, high: bool) {
        let before = self.m_scl;
        self.m_scl = high;
        if high && !before {
            self.scl_pulses += 1;
            self.scl_hold_until = self.now.saturating_add(self.stretch);
            self.on_rise();
        } else if !high && before {
            self.on_fall();
        }
    }

    fn on_start(&mut self) {
        self.events.push(Event::Start);
        self.phase = Phase::RecvByte;
        self.shift = 0;
        self.bits = 0;
        self.s_sda = true;
        self.expect_address = true;
        self.expect_ten_low = false;
    }

    fn on_stop(&mut self) {
        self.events.push(Event::Stop);
        self.phase = Phase::Idle;
        self.s_sda = true;
        self.ten_matched = false;
    }

    fn on_rise(&mut self) {
        match self.phase {
            Phase::RecvByte => {
                self.shift = (self.shift << 1) | u8::from(self.sda_level());
                self.bits += 1;
            }
            Phase::AckIn => {
                self.master_acked = !self.sda_level();
                self.events.push(Event::MasterAck(self.master_acked));
            }
            _ => {}
        }
    }

    fn on_fall(&mut self) {
        if self.stuck_sda_pulses > 0 {
            self.stuck_sda_pulses -= 1;
        }
        match self.phase {
            Phase::RecvByte if self.bits == 8 => {
                let (ack, after) = self.byte_received(self.shift);
                self.s_sda = !ack;
                self.after_ack = after;
                self.phase = Phase::AckOut;
            }
            Phase::AckOut => {
                self.s_sda = true;
                match self.after_ack {
                    After::Recv => {
                        self.phase = Phase::RecvByte;
                        self.shift = 0;
                        self.bits = 0;
                    }
                    After::Send => self.load_and_drive(),
                    After::Ignore => self.phase = Phase::Ignore,
                }
            }
            Phase::SendByte => {
                self.bits += 1;
                if self.bits == 8 {
                    self.s_sda = true;
                    self.phase = Phase::AckIn;
                } else {
                    self.s_sda = (self.current >> (7 - self.bits)) & 1 != 0;
                }
            }
            Phase::AckIn => {
                if self.master_acked {
                    self.load_and_drive();
                } else {
                    self.s_sda = true;
                    self.phase = Phase::Ignore;
                }
            }
            _ => {}
        }
    }

    fn load_and_drive(&mut self) {
        self.current = self.target.tx.pop_front().unwrap_or(0xff);
        self.events.push(Event::Read { byte: self.current });
        self.bits = 0;
        self.s_sda = self.current & 0x80 != 0;
        self.phase = Phase::SendByte;
    }

    fn address_ack(&mut self) -> bool {
        if self.target.nak_addresses > 0 {
            self.target.nak_addresses -= 1;
            false
        } else {
            true
        }
    }

    fn byte_received(&mut self, byte: u8) -> (bool, After) {
        if self.expect_address {
            self.expect_address = false;
            let (ten_bit, addr) = (self.target.ten_bit, self.target.addr);
            let ack = if byte & 0xf8 == 0xf0 {
                let upper = u16::from((byte >> 1) & 0x03);
                if ten_bit && upper == (addr >> 8) & 0x03 {
                    if byte & 1 == 0 {
                        self.expect_ten_low = true;
                        self.address_ack()
                    } else if self.ten_matched {
                        self.read = true;
                        self.address_ack()
                    } else {
                        false
                    }
                } else {
                    false
                }
            } else if !ten_bit && u16::from(byte >> 1) == addr {
                self.read = byte & 1 != 0;
                self.address_ack()
            } else {
                false
            };
            self.events.push(Event::Address { byte, ack });
            let after = match (ack, self.read && !self.expect_ten_low) {
                (false, _) => After::Ignore,
                (true, true) => After::Send,
                (true, false) => After::Recv,
            };
            return (ack, after);
        }

        if self.expect_ten_low {
            self.expect_ten_low = false;
            let ack = u16::from(byte) == self.target.addr & 0xff;
            if ack {
                self.ten_matched = true;
                self.read = false;
            }
            self.events.push(Event::Address { byte, ack });
            return (ack, if ack { After::Recv } else { After::Ignore });
        }

        let index = self.target.rx.len();
        let ack = self.target.nak_write_at != Some(index);
        self.target.rx.push(byte);
        if self.target.loopback {
            self.target.tx.push_back(byte);
        }
        self.events.push(Event::Write { byte, ack });
        (ack, After::Recv)
    }
}

/// Handle on the simulated bus. Clones share state.
#[derive(Clone)]
pub struct SimBus {
    state: Rc<RefCell<State>>,
}

impl SimBus {
    pub fn new(target: Target) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                m_sda: true,
                m_scl: true,
                s_sda: true,
                phase: Phase::Idle,
                after_ack: After::Ignore,
                shift: 0,
                bits: 0,
                current: 0,
                expect_address: false,
                expect_ten_low: false,
                ten_matched: false,
                read: false,
                master_acked: false,
                target,
                events: Vec::new(),
                now: 0,
                stretch: 0,
                scl_hold_until: 0,
                stuck_sda_pulses: 0,
                scl_sense: true,
                scl_pulses: 0,
                yields: 0,
                delayed_ns: 0,
            })),
        }
    }

    pub fn adapter(&self, config: BitAlgoConfig) -> BitAdapter<SimLines, SimDelay, SimClock> {
        BitAdapter::new(
            SimLines(self.clone()),
            SimDelay(self.clone()),
            SimClock(self.clone()),
            config,
        )
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.state.borrow().events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn rx(&self) -> Vec<u8> {
        self.state.borrow().target.rx.clone()
    }

    pub fn scl_pulses(&self) -> u32 {
        self.state.borrow().scl_pulses
    }

    pub fn yields(&self) -> u32 {
        self.state.borrow().yields
    }

    pub fn delayed_ns(&self) -> u64 {
        self.state.borrow().delayed_ns
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Hold SCL low for `ticks` after every release by the master.
    pub fn set_stretch(&self, ticks: u64) {
        self.state.borrow_mut().stretch = ticks;
    }

    /// Hold SDA low until SCL has fallen `pulses` times.
    pub fn set_stuck_sda(&self, pulses: u32) {
        self.state.borrow_mut().stuck_sda_pulses = pulses;
    }

    pub fn set_scl_sense(&self, sense: bool) {
        self.state.borrow_mut().scl_sense = sense;
    }

    pub fn levels(&self) -> (bool, bool) {
        let state = self.state.borrow();
        (state.sda_level(), state.scl_level())
    }
}

pub struct SimLines(SimBus);

impl BitLines for SimLines {
    fn set_sda(&mut self, high: bool) {
        self.0.state.borrow_mut().set_sda(high);
    }

    fn set_scl(&mut self, high: bool) {
        self.0.state.borrow_mut().set_scl(high);
    }

    fn get_sda(&mut self) -> bool {
        self.0.state.borrow().sda_level()
    }

    fn scl_sense(&self) -> bool {
        self.0.state.borrow().scl_sense
    }

    fn get_scl(&mut self) -> bool {
        self.0.state.borrow().scl_level()
    }
}

pub struct SimDelay(SimBus);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.state.borrow_mut().delayed_ns += u64::from(ns);
    }
}

pub struct SimClock(SimBus);

impl Timebase for SimClock {
    fn now(&mut self) -> u64 {
        self.0.state.borrow().now
    }

    fn relax(&mut self) {
        self.0.state.borrow_mut().now += 1;
    }

    fn yield_now(&mut self) {
        self.0.state.borrow_mut().yields += 1;
    }
}
