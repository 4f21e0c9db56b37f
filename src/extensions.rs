pub trait ResultExtensions<T, E> {
    /// Lifts a plain value into `Ok`, to start an `and_then` chain.
    fn pure(item: T) -> Result<T, E> {
        Ok(item)
    }
}

impl<T, E> ResultExtensions<T, E> for Result<T, E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_chain() {
        let result: Result<i32, String> = Result::pure(2).and_then(|n| Ok(n * 3));
        assert_eq!(result, Ok(6));
    }
}
