use std::io::Write;

use ectask_core::StimulusDescriptor;
use ectask_experiment::Surface;

/// Text stand-in for a display: one line per screen.
pub struct ConsoleSurface<W> {
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn describe(stimulus: &StimulusDescriptor) -> Option<String> {
    let text = match stimulus {
        StimulusDescriptor::Fixation => "+".to_string(),
        StimulusDescriptor::Blank => return None,
        StimulusDescriptor::LineMask { seed } => {
            // Pattern follows the seed bits.
            (0..24u32)
                .map(|i| if (*seed >> i) & 1 == 1 { '#' } else { '/' })
                .collect()
        }
        StimulusDescriptor::Lines {
            left_len,
            right_len,
        } => format!("|{left_len}|    |{right_len}|"),
        StimulusDescriptor::Digit { digit } => digit.to_string(),
        StimulusDescriptor::DigitSequence { digits } => {
            digits.iter().map(|d| char::from(b'0' + d)).collect()
        }
        StimulusDescriptor::Arrows { .. } => stimulus.arrow_row().unwrap_or_default(),
        StimulusDescriptor::ResponsePrompt { block, trial_index } => {
            format!("[{block} {trial_index}] which line was longer?")
        }
        StimulusDescriptor::EntryPrompt { max_len } => {
            format!("type the {max_len} digits in order, then press enter")
        }
        StimulusDescriptor::Feedback { correct: true } => "Correct".to_string(),
        StimulusDescriptor::Feedback { correct: false } => "Incorrect".to_string(),
    };
    Some(text)
}

impl<W: Write> Surface for ConsoleSurface<W> {
    fn draw(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
        if let Some(text) = describe(stimulus) {
            writeln!(self.out, "{text}")?;
            self.out.flush()?;
        }
        Ok(())
    }
}
