#![allow(dead_code)]
// Shared inspector fixtures for engine tests

use migrant_core::{ClassEntity, FileEntity, Inspector, InspectorContract, InspectorError, NodeDecorator, ProjectFileDecorator};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// File inspector backed by a closure
pub struct FileRule<F> {
    contract: InspectorContract,
    analyze: F,
}

pub fn file_rule<F>(contract: InspectorContract, analyze: F) -> FileRule<F>
where
    F: Fn(&FileEntity, &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> + Send + Sync,
{
    FileRule { contract, analyze }
}

impl<F> Inspector for FileRule<F>
where
    F: Fn(&FileEntity, &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> + Send + Sync,
{
    type Target = FileEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn analyze(&self, entity: &FileEntity, decorator: &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> {
        (self.analyze)(entity, decorator)
    }
}

/// Class inspector backed by a closure
pub struct ClassRule<F> {
    contract: InspectorContract,
    analyze: F,
}

pub fn class_rule<F>(contract: InspectorContract, analyze: F) -> ClassRule<F>
where
    F: Fn(&ClassEntity, &mut NodeDecorator<'_>) -> Result<(), InspectorError> + Send + Sync,
{
    ClassRule { contract, analyze }
}

impl<F> Inspector for ClassRule<F>
where
    F: Fn(&ClassEntity, &mut NodeDecorator<'_>) -> Result<(), InspectorError> + Send + Sync,
{
    type Target = ClassEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn analyze(&self, entity: &ClassEntity, decorator: &mut NodeDecorator<'_>) -> Result<(), InspectorError> {
        (self.analyze)(entity, decorator)
    }
}
