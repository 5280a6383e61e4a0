mod validators;

pub use validators::ValidatorSetExpectation;
