mod sl001_test;
