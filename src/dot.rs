//! Graphviz export for grammars and automata.

use std::fmt::Write as _;

use crate::grammar::{Grammar, Production};
use crate::nfa::Nfa;

impl Grammar {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph grammar {{")?;
        writeln!(dot, "node [shape=circle];")?;

        for id in self.ids() {
            let nt = self.nonterminal(id);
            let shape = if Some(id) == self.start() {
                ", shape=doublecircle"
            } else {
                ""
            };
            writeln!(dot, "{} [label=\"{}\"{}];", id.id(), nt.display_name(), shape)?;
        }

        for id in self.ids() {
            for p in self.nonterminal(id).productions() {
                match p {
                    Production::Terminal(t) => {
                        // terminal leaves are inlined as edge-less labels
                        writeln!(
                            dot,
                            "{} [xlabel=\"{}\"];",
                            id.id(),
                            format!("{}", t).replace('"', "\\\"")
                        )?;
                    }
                    Production::Unit(a) => {
                        writeln!(dot, "{} -> {};", id.id(), a.id())?;
                    }
                    Production::Concat(a, b) => {
                        writeln!(dot, "{} -> {} [label=\"1\"];", id.id(), a.id())?;
                        writeln!(dot, "{} -> {} [label=\"2\"];", id.id(), b.id())?;
                    }
                    Production::UnaryOp(op, a) => {
                        writeln!(dot, "{} -> {} [label=\"{}\"];", id.id(), a.id(), op)?;
                    }
                    Production::BinaryOp(op, a, b) => {
                        writeln!(dot, "{} -> {} [label=\"{}\"];", id.id(), a.id(), op)?;
                        writeln!(dot, "{} -> {} [label=\"{} aux\"];", id.id(), b.id(), op)?;
                    }
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl Nfa {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph nfa {{")?;
        writeln!(dot, "rankdir=LR;")?;
        writeln!(dot, "node [shape=circle];")?;

        for state in self.states() {
            let shape = if state.is_accepting {
                " [shape=doublecircle]"
            } else {
                ""
            };
            writeln!(dot, "{}{};", state.id().index(), shape)?;
        }
        // entry marker
        writeln!(dot, "init [shape=point];")?;
        writeln!(dot, "init -> {};", self.start().index())?;

        for state in self.states() {
            for edge in state.edges() {
                let style = if edge.taints.is_empty() {
                    ""
                } else {
                    ", style=dashed"
                };
                writeln!(
                    dot,
                    "{} -> {} [label=\"{}\"{}];",
                    state.id().index(),
                    edge.target.index(),
                    edge.label.render().replace('"', "\\\""),
                    style
                )?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use crate::build::build_nfa;
    use crate::parser::parse_grammar;

    #[test]
    fn test_grammar_dot_mentions_labels() {
        let g = parse_grammar("A -> a | B\nB -> Ab\n").unwrap();
        let dot = g.to_dot().unwrap();
        assert!(dot.contains("digraph grammar"));
        assert!(dot.contains("label=\"A\""));
        assert!(dot.contains("doublecircle"));
    }

    #[test]
    fn test_nfa_dot_has_entry_marker() {
        let g = parse_grammar("A -> a\n").unwrap();
        let nfa = build_nfa(&g).unwrap();
        let dot = nfa.to_dot().unwrap();
        assert!(dot.contains("init ->"));
        assert!(dot.contains("\\Qa\\E"));
    }
}
