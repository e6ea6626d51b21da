/// Character set used to draw the tree. Every column is three characters wide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Glyphs {
    #[default]
    Unicode,
    Ascii,
}

impl Glyphs {
    fn vertical(self) -> &'static str {
        match self {
            Glyphs::Unicode => "│  ",
            Glyphs::Ascii => "|  ",
        }
    }

    fn tee(self) -> &'static str {
        match self {
            Glyphs::Unicode => "├──",
            Glyphs::Ascii => "|--",
        }
    }

    fn corner(self) -> &'static str {
        match self {
            Glyphs::Unicode => "└──",
            Glyphs::Ascii => "`--",
        }
    }

    fn blank(self) -> &'static str {
        "   "
    }
}

/// Last-sibling flags along the path from the root to one line.
///
/// Index `i` tells whether the node drawn at depth `i + 1` is the last entry of its parent. The
/// root is never part of the path, so a root line has no prefix at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connectors {
    last: Vec<bool>,
}

impl Connectors {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.last.len()
    }

    /// Context of an entry one level below this one.
    pub fn descend(&self, is_last: bool) -> Self {
        let mut last = Vec::with_capacity(self.last.len() + 1);
        last.extend_from_slice(&self.last);
        last.push(is_last);
        Self { last }
    }

    pub fn prefix(&self, glyphs: Glyphs) -> String {
        let Some((is_last, ancestors)) = self.last.split_last() else {
            return String::new();
        };

        let mut prefix = String::with_capacity(self.last.len() * 9);
        for &ancestor_is_last in ancestors {
            prefix.push_str(if ancestor_is_last {
                glyphs.blank()
            } else {
                glyphs.vertical()
            });
        }
        prefix.push_str(if *is_last {
            glyphs.corner()
        } else {
            glyphs.tee()
        });
        prefix
    }
}
