//! Construction macros for terms and lists.
//!
//! [logic_var!](../macro.logic_var.html) - creates a named logic variable.<br>
//! [atom!](../macro.atom.html) - makes a string atom from a string slice.<br>
//! [slist!](../macro.slist.html) - builds a logic list, with or without a
//! pipe tail, as a singly linked cons chain.<br>
//! [rec!](../macro.rec.html) - builds a record term from `key: value` pairs.

/// Creates a named logic variable term.
///
/// # Usage
/// ```
/// use flowkanren::*;
///
/// let x = logic_var!("X");
/// ```
#[macro_export]
macro_rules! logic_var {
    ($name:expr) => {
        $crate::term::Term::named_var($name)
    };
}

/// Makes a string atom from a string slice.
#[macro_export]
macro_rules! atom {
    ($s:expr) => {
        $crate::term::Term::str($s)
    };
}

/// Builds a logic list.
///
/// # Usage
/// * To build: `[a, b, c]`
///
/// ```
/// use flowkanren::*;
///
/// let list1 = slist!(atom!("a"), atom!("b"), atom!("c"));
/// ```
///
/// * To build: `[a, b | $Tail]`, a pipe before the last argument marks the
/// tail:
///
/// ```
/// use flowkanren::*;
///
/// let tail = logic_var!("Tail");
/// let list2 = slist!(atom!("a"), atom!("b"); tail);
/// ```
///
/// * To build: `[]`
///
/// ```
/// use flowkanren::*;
///
/// let list3 = slist!();
/// ```
#[macro_export]
macro_rules! slist {
    () => {
        $crate::term::Term::Nil
    };
    ($($item:expr),+ $(,)?) => {
        $crate::term::Term::logic_list(vec![$($item),+])
    };
    ($($item:expr),+ ; $tail:expr) => {
        $crate::term::Term::logic_list_with_tail(vec![$($item),+], $tail)
    };
}

/// Builds a record term from `key: value` pairs.
///
/// # Usage
/// ```
/// use flowkanren::*;
///
/// let person = rec!("name": atom!("ada"), "age": term::Term::int(36));
/// ```
#[macro_export]
macro_rules! rec {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut fields = std::collections::BTreeMap::new();
        $(fields.insert($key.to_string(), $value);)*
        $crate::term::Term::record(fields)
    }};
}

#[cfg(test)]
mod test {
    use crate::term::Term;

    #[test]
    fn slist_builds_a_proper_list() {
        let list = slist!(atom!("a"), atom!("b"));
        let items = list.logic_list_to_vec().expect("proper list");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn slist_with_empty_args_is_nil() {
        let list: Term = slist!();
        assert!(list.is_nil());
    }

    #[test]
    fn rec_builds_a_record_with_given_keys() {
        let r = rec!("name" => atom!("ada"));
        match r {
            Term::Record(fields) => assert!(fields.contains_key("name")),
            _ => panic!("expected a record"),
        }
    }
}
