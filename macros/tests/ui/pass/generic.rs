use pacta::contracts;

pub struct Stack<T> {
    items: Vec<T>,
    capacity: usize,
}

#[contracts(invariant(self.items.len() <= self.capacity))]
impl<T> Stack<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Stack {
            items: Vec::new(),
            capacity,
        }
    }

    #[pre(!self.is_full())]
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[post(|ret| *ret <= self.capacity)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }
}

fn main() {
    let mut stack = Stack::with_capacity(2);
    stack.push("a".to_string());
    stack.push("b".to_string());
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.peek().map(String::as_str), Some("b"));

    let err = pacta::catch(|| stack.push("c".to_string())).unwrap_err();
    assert!(err.is_precondition());

    assert_eq!(stack.pop().as_deref(), Some("b"));
    assert_eq!(stack.len(), 1);
}
