//! Human-readable page dump

use std::fmt;

use super::Page;

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {} of '{}' [{}/{}]",
            self.name(),
            self.table_name(),
            self.size(),
            self.capacity()
        )?;
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => writeln!(f, " keys {}..={}", min, max)?,
            _ => writeln!(f, " empty")?,
        }
        for (position, tuple) in self.tuples().iter().enumerate() {
            writeln!(f, "  {:>4}: {}", position, tuple)?;
        }
        Ok(())
    }
}
