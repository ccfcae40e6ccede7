//! Input polling.
//!
//! Turns device levels into station events once per tick: a card in a
//! reader's field becomes one `CardPresented` and the reader is released, and
//! a change in the button level becomes a press or release edge.

use gabarito_core::{
    ReaderId,
    device::{ButtonInput, CardReader},
};

use crate::driver::StationEvent;

/// Polls card readers and the button.
#[derive(Debug)]
pub struct InputPoller<R, B> {
    readers: Vec<(ReaderId, R)>,
    button: B,
    button_down: bool,
}

impl<R: CardReader, B: ButtonInput> InputPoller<R, B> {
    /// Poll `readers` in order, and `button`.
    pub fn new(readers: Vec<(ReaderId, R)>, button: B) -> Self {
        Self { readers, button, button_down: false }
    }

    /// Collect the events observable right now.
    pub fn poll(&mut self) -> Vec<StationEvent> {
        let mut events = Vec::new();

        for (reader, device) in &mut self.readers {
            if !device.poll_present() {
                continue;
            }
            match device.read_identifier() {
                Some(identifier) => {
                    tracing::debug!(?reader, %identifier, "card read");
                    events.push(StationEvent::CardPresented { reader: *reader, identifier });
                },
                None => tracing::debug!(?reader, "card present but unreadable"),
            }
            device.release();
        }

        let pressed = self.button.is_pressed();
        if pressed != self.button_down {
            self.button_down = pressed;
            events.push(if pressed {
                StationEvent::ButtonPressed
            } else {
                StationEvent::ButtonReleased
            });
        }

        events
    }

    /// Reader devices, in polling order.
    pub fn readers_mut(&mut self) -> impl Iterator<Item = (ReaderId, &mut R)> {
        self.readers.iter_mut().map(|(id, device)| (*id, device))
    }

    /// The button device.
    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }
}

#[cfg(test)]
mod tests {
    use gabarito_proto::Identifier;

    use super::*;
    use crate::bench::{BenchButton, BenchReader};

    const CARD: Identifier = Identifier::new([1, 2, 3, 4]);

    fn poller() -> InputPoller<BenchReader, BenchButton> {
        InputPoller::new(
            vec![(ReaderId::Primary, BenchReader::new()), (ReaderId::Secondary, BenchReader::new())],
            BenchButton::default(),
        )
    }

    #[test]
    fn idle_devices_produce_nothing() {
        assert!(poller().poll().is_empty());
    }

    #[test]
    fn card_is_reported_once_per_presentation() {
        let mut poller = poller();
        for (reader, device) in poller.readers_mut() {
            if reader == ReaderId::Secondary {
                device.present(CARD);
            }
        }

        assert_eq!(
            poller.poll(),
            vec![StationEvent::CardPresented { reader: ReaderId::Secondary, identifier: CARD }]
        );
        assert!(poller.poll().is_empty());
    }

    #[test]
    fn button_levels_become_edges() {
        let mut poller = poller();

        poller.button_mut().set(true);
        assert_eq!(poller.poll(), vec![StationEvent::ButtonPressed]);
        assert!(poller.poll().is_empty());

        poller.button_mut().set(false);
        assert_eq!(poller.poll(), vec![StationEvent::ButtonReleased]);
    }

    #[test]
    fn press_and_release_between_polls_are_both_seen() {
        let mut poller = poller();

        poller.button_mut().set(true);
        poller.button_mut().set(false);

        assert_eq!(poller.poll(), vec![StationEvent::ButtonPressed]);
        assert_eq!(poller.poll(), vec![StationEvent::ButtonReleased]);
        assert!(poller.poll().is_empty());
    }
}
