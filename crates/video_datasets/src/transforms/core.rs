use anyhow::{Context, Result};
use std::marker::PhantomData;

/// A single processing step that turns an input of type `I` into an output of type `O`.
///
/// Frame loading is expressed as a chain of transforms, e.g.
/// `LoadFrame::new().then(EnsureDepth::rgb())` reads a file and normalizes its channel
/// depth in one call. Chaining is resolved at compile time, so a chain costs the same
/// as calling the steps by hand.
///
/// `then()` requires:
/// 1. **Matching types**: `self: Transform<I, O>`, `next: Transform<O, M>`
/// 2. **Concrete receivers**: `Self: Sized`
/// 3. **Sendable intermediates**: `O: Send`, `M: Send`
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// Two transforms run back to back (`A` -> `B`).
/// `PhantomData<M>` pins the intermediate type.
#[derive(Debug, Clone)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::path::PathBuf;

    struct FileStem;
    impl Transform<PathBuf, String> for FileStem {
        fn apply(&self, input: PathBuf) -> Result<String> {
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("no file stem in {}", input.display()))
        }
    }

    struct ParseFrameNumber;
    impl Transform<String, usize> for ParseFrameNumber {
        fn apply(&self, input: String) -> Result<usize> {
            Ok(input.parse()?)
        }
    }

    struct NextFrame;
    impl Transform<usize, usize> for NextFrame {
        fn apply(&self, input: usize) -> Result<usize> {
            Ok(input + 1)
        }
    }

    #[test]
    fn test_chain_with_then() -> Result<()> {
        let pipeline = FileStem.then(ParseFrameNumber);
        assert_eq!(pipeline.apply(PathBuf::from("seq/0042.png"))?, 42);
        Ok(())
    }

    #[test]
    fn test_three_step_chain() -> Result<()> {
        let pipeline = FileStem.then(ParseFrameNumber).then(NextFrame);
        assert_eq!(pipeline.apply(PathBuf::from("0007.png"))?, 8);
        Ok(())
    }

    #[test]
    fn test_chain_error_names_both_steps() {
        let chain = FileStem.then(ParseFrameNumber);
        let err = chain.apply(PathBuf::from("frame_a.png")).unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("Transform chain failed"));
        assert!(msg.contains("FileStem"));
        assert!(msg.contains("ParseFrameNumber"));
    }
}
