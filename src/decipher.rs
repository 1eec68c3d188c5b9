use rand::seq::SliceRandom;

const SCRAMBLE_CHARS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '_', '+', '-', '=', '[', ']', '{', '}', '|',
    ';', ':', ',', '.', '<', '>', '?', '/', '~', '`', '0', '1', '2', '3', '4', '5', '6', '7', '8',
    '9',
];

/// Reveal animation for the unlock banner: every tick the revealed prefix
/// grows a little and the rest re-scrambles. Purely cosmetic, driven by
/// the app's tick events like any other animation state.
#[derive(Debug)]
pub struct Decipher {
    text: Vec<char>,
    display: String,
    revealed: f64,
    per_tick: f64,
}

impl Decipher {
    pub fn new(text: &str) -> Self {
        let mut decipher = Self {
            text: text.chars().collect(),
            display: String::new(),
            revealed: 0.0,
            per_tick: 0.2,
        };
        decipher.rescramble();
        decipher
    }

    /// Advance one tick. Returns true while the animation is still running.
    pub fn update(&mut self) -> bool {
        if self.is_done() {
            return false;
        }
        self.revealed += self.per_tick;
        self.rescramble();
        !self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.revealed >= self.text.len() as f64
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    fn rescramble(&mut self) {
        let mut rng = rand::thread_rng();
        let cutoff = self.revealed as usize;
        self.display = self
            .text
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if i < cutoff || c == ' ' {
                    c
                } else {
                    *SCRAMBLE_CHARS.choose(&mut rng).unwrap_or(&'#')
                }
            })
            .collect();
    }
}
